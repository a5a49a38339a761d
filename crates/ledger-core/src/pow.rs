use crate::{constants::CANCEL_CHECK_INTERVAL, Block, LedgerError};
use tokio_util::sync::CancellationToken;

/// True when the first `difficulty` hex characters of `hash` are all `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

pub fn count_leading_zero_nibbles(hash: &str) -> u32 {
    hash.bytes().take_while(|b| *b == b'0').count() as u32
}

/// Search nonces upwards from zero until the block digest meets `difficulty`.
/// On return `block.nonce` holds the lowest winning nonce; the digest is returned.
pub fn seal(block: &mut Block, difficulty: u32) -> String {
    let template = block.nonce_template();
    let mut nonce = 0u64;
    loop {
        let hash = template.hash(nonce);
        if meets_difficulty(&hash, difficulty) {
            block.nonce = Some(nonce);
            return hash;
        }
        nonce = nonce.wrapping_add(1);
    }
}

/// Same search as [`seal`], abandoned once `cancel` fires. A cancelled block
/// is left exactly as it was passed in.
pub fn seal_until_cancelled(
    block: &mut Block,
    difficulty: u32,
    cancel: &CancellationToken,
) -> Result<String, LedgerError> {
    let template = block.nonce_template();
    let mut nonce = 0u64;
    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Err(LedgerError::Cancelled);
        }
        let hash = template.hash(nonce);
        if meets_difficulty(&hash, difficulty) {
            block.nonce = Some(nonce);
            return Ok(hash);
        }
        nonce = nonce.wrapping_add(1);
    }
}
