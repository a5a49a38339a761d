//! HTTP front end for a single in-memory ledger.

pub mod constants;
pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use ledger_core::{mine::seal_parallel, Block, Ledger, LedgerError, Transaction};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{net::TcpListener, sync::OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::ApiError;
pub use routes::router;

#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub difficulty: u32,
    /// Size of the rayon pool used for the nonce search; 0 lets rayon decide.
    pub mining_threads: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            difficulty: ledger_core::constants::DEFAULT_DIFFICULTY,
            mining_threads: 0,
        }
    }
}

/// Shared handler state. The ledger sits behind one lock that is never held
/// across the proof-of-work search.
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<Mutex<Ledger>>,
    mining: Arc<tokio::sync::Mutex<()>>,
    miners: Arc<rayon::ThreadPool>,
    shutdown: CancellationToken,
}

impl AppState {
    /// Seals genesis on the calling thread; gives up with
    /// [`LedgerError::Cancelled`] if `shutdown` fires first.
    pub fn new(config: &NodeConfig, shutdown: CancellationToken) -> Result<Self> {
        let ledger = Ledger::with_difficulty_until_cancelled(config.difficulty, &shutdown)?;
        let miners = rayon::ThreadPoolBuilder::new()
            .num_threads(config.mining_threads)
            .thread_name(|i| format!("miner-{i}"))
            .build()
            .context("building mining thread pool")?;
        Ok(Self {
            ledger: Arc::new(Mutex::new(ledger)),
            mining: Arc::new(tokio::sync::Mutex::new(())),
            miners: Arc::new(miners),
            shutdown,
        })
    }

    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn submit_transaction(&self, tx: Transaction) {
        self.ledger().submit_transaction(tx);
    }

    /// Mine the pending pool. The candidate is taken under the ledger lock,
    /// sealed on the mining pool with the lock released, then committed.
    /// One search runs at a time; a commit that lost the race to a newer tip
    /// is rejected and its transactions stay pending.
    pub async fn mine_pending(&self) -> Result<Option<u64>, ApiError> {
        let mining = self.mining.clone().lock_owned().await;

        let (candidate, difficulty) = {
            let ledger = self.ledger();
            (ledger.candidate_block(), ledger.difficulty())
        };
        let Some(block) = candidate else {
            return Ok(None);
        };

        let (block, proof, _mining) = self.seal_on_pool(block, difficulty, mining).await?;
        let index = self.ledger().commit_block(block, proof)?;
        Ok(Some(index))
    }

    /// Run the nonce search on the mining pool. Dropping the returned future
    /// cancels the search, and `mining` is only released once the blocking
    /// task has actually stopped.
    async fn seal_on_pool(
        &self,
        mut block: Block,
        difficulty: u32,
        mining: OwnedMutexGuard<()>,
    ) -> Result<(Block, String, OwnedMutexGuard<()>), ApiError> {
        let search = self.shutdown.child_token();
        let _abandon = search.clone().drop_guard();
        let miners = self.miners.clone();
        let sealed = tokio::task::spawn_blocking(move || {
            let proof = miners.install(|| seal_parallel(&mut block, difficulty, &search))?;
            Ok::<_, LedgerError>((block, proof, mining))
        })
        .await??;
        Ok(sealed)
    }
}

/// Serve until the state's shutdown token is cancelled.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let shutdown = state.shutdown.clone();
    info!("ledger-node listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
