//! In-memory, single-writer ledger engine: hash-linked blocks of opaque
//! transactions, sealed by a hex-prefix proof of work.

pub mod block;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod pow;
pub mod validate;

use std::time::{SystemTime, UNIX_EPOCH};

pub use block::Block;
pub use error::LedgerError;
pub use ledger::Ledger;
pub use tokio_util::sync::CancellationToken;

/// Transactions are opaque to the core; any JSON value is accepted.
pub type Transaction = serde_json::Value;

/// Seconds since the Unix epoch with sub-second precision.
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
