use crate::{constants::NONCES_PER_BATCH, pow::meets_difficulty, Block, LedgerError};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Seals a block by searching nonces in parallel, one batch of
/// `NONCES_PER_BATCH` at a time. Within a batch rayon's `find_first` keeps the
/// lowest winner, so the nonce found is the same one [`crate::pow::seal`]
/// would find. `cancel` is checked between batches.
///
/// Runs on the current rayon pool; wrap the call in `ThreadPool::install` to
/// bound the worker count.
pub fn seal_parallel(
    block: &mut Block,
    difficulty: u32,
    cancel: &CancellationToken,
) -> Result<String, LedgerError> {
    let template = block.nonce_template();
    let mut start = 0u64;
    loop {
        if cancel.is_cancelled() {
            debug!(index = block.index, tried = start, "parallel search cancelled");
            return Err(LedgerError::Cancelled);
        }
        let end = start.saturating_add(NONCES_PER_BATCH);
        let found = (start..end)
            .into_par_iter()
            .map(|nonce| (nonce, template.hash(nonce)))
            .find_first(|(_, hash)| meets_difficulty(hash, difficulty));

        if let Some((nonce, hash)) = found {
            block.nonce = Some(nonce);
            info!(index = block.index, nonce, %hash, "sealed block");
            return Ok(hash);
        }
        if end == u64::MAX {
            return Err(LedgerError::NonceSpaceExhausted { index: block.index });
        }
        start = end;
    }
}
