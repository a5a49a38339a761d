use crate::constants::MAX_DIFFICULTY;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The candidate was built against a block that is no longer the tip.
    #[error("stale block: previous_hash {found} does not match tip {expected}")]
    InvalidLinkage { expected: String, found: String },

    /// The block links to the tip but does not sit at the next position.
    #[error("block index {found} does not follow tip, expected {expected}")]
    InvalidIndex { expected: u64, found: u64 },

    /// The claimed digest misses the difficulty target or does not match the block contents.
    #[error("invalid proof of work for block {index}")]
    InvalidProof { index: u64 },

    #[error("proof-of-work search cancelled")]
    Cancelled,

    #[error("no nonce satisfies the difficulty for block {index}")]
    NonceSpaceExhausted { index: u64 },

    #[error("difficulty {0} is above the maximum of {max}", max = MAX_DIFFICULTY)]
    DifficultyOutOfRange(u32),
}
