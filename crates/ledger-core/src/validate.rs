use crate::{constants::GENESIS_PREVIOUS_HASH, pow::meets_difficulty, Block};
use thiserror::Error;
use tracing::warn;

/// Why a block failed chain validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("block carries no hash")]
    MissingHash,
    #[error("stored hash misses the difficulty target or does not match the block contents")]
    InvalidProof,
    #[error("previous_hash does not match the preceding block")]
    BrokenLink,
    #[error("index does not match the block's position in the chain")]
    BadIndex,
}

/// `claimed_hash` meets `difficulty` and equals a fresh digest of `block`.
/// The block's stored `hash` plays no part.
pub fn is_valid_proof(block: &Block, claimed_hash: &str, difficulty: u32) -> bool {
    meets_difficulty(claimed_hash, difficulty) && block.compute_hash() == claimed_hash
}

/// Walk from genesis to tip and report the first block that fails, if any.
pub fn find_invalid_block(chain: &[Block], difficulty: u32) -> Option<(usize, ChainFault)> {
    let mut previous_hash = GENESIS_PREVIOUS_HASH;
    for (position, block) in chain.iter().enumerate() {
        let fault = match block.hash.as_deref() {
            None => Some(ChainFault::MissingHash),
            Some(stored) if !is_valid_proof(block, stored, difficulty) => {
                Some(ChainFault::InvalidProof)
            }
            Some(_) if block.previous_hash != previous_hash => Some(ChainFault::BrokenLink),
            Some(_) if usize::try_from(block.index).ok() != Some(position) => {
                Some(ChainFault::BadIndex)
            }
            Some(stored) => {
                previous_hash = stored;
                None
            }
        };
        if let Some(fault) = fault {
            warn!(position, index = block.index, %fault, "chain validation failed");
            return Some((position, fault));
        }
    }
    None
}

pub fn check_chain_validity(chain: &[Block], difficulty: u32) -> bool {
    find_invalid_block(chain, difficulty).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::seal;
    use serde_json::json;

    /// Build a linked chain of `len` sealed blocks without going through `Ledger`.
    fn sealed_chain(len: u64, difficulty: u32) -> Vec<Block> {
        let mut chain: Vec<Block> = Vec::new();
        for index in 0..len {
            let previous_hash = chain
                .last()
                .and_then(|b| b.hash.clone())
                .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string());
            let mut block = Block::new(
                index,
                vec![json!(format!("tx-{index}"))],
                1_650_000_000.0 + index as f64,
                previous_hash,
            );
            let hash = seal(&mut block, difficulty);
            block.hash = Some(hash);
            chain.push(block);
        }
        chain
    }

    #[test]
    fn valid_proof_requires_difficulty_and_match() {
        let mut block = sealed_chain(1, 2).remove(0);
        let good = block.hash.clone().unwrap();
        assert!(is_valid_proof(&block, &good, 2));
        // Correct digest, harder target.
        if !good.starts_with("000") {
            assert!(!is_valid_proof(&block, &good, 3));
        }
        // Right prefix, wrong digest.
        let forged = format!("00{}", "1".repeat(62));
        assert!(!is_valid_proof(&block, &forged, 2));
        // Content changed under a previously valid digest.
        block.nonce = block.nonce.map(|n| n + 1);
        assert!(!is_valid_proof(&block, &good, 2));
    }

    #[test]
    fn sealed_chain_is_valid() {
        let chain = sealed_chain(4, 2);
        assert!(check_chain_validity(&chain, 2));
        assert_eq!(find_invalid_block(&chain, 2), None);
    }

    #[test]
    fn empty_chain_is_valid() {
        assert!(check_chain_validity(&[], 2));
    }

    #[test]
    fn validation_does_not_mutate() {
        let chain = sealed_chain(3, 1);
        let snapshot = chain.clone();
        let first = check_chain_validity(&chain, 1);
        let second = check_chain_validity(&chain, 1);
        assert_eq!(first, second);
        assert_eq!(chain, snapshot);
    }

    #[test]
    fn detects_missing_hash() {
        let mut chain = sealed_chain(3, 1);
        chain[2].hash = None;
        assert_eq!(find_invalid_block(&chain, 1), Some((2, ChainFault::MissingHash)));
    }

    #[test]
    fn detects_tampered_transaction() {
        let mut chain = sealed_chain(3, 1);
        chain[1].transactions[0] = json!("forged");
        assert_eq!(find_invalid_block(&chain, 1), Some((1, ChainFault::InvalidProof)));
    }

    #[test]
    fn detects_rehashed_tampered_block() {
        // Forger reseals the edited block; its successor no longer links to it.
        let mut chain = sealed_chain(3, 1);
        chain[1].transactions[0] = json!("forged");
        let hash = seal(&mut chain[1], 1);
        chain[1].hash = Some(hash);
        assert_eq!(find_invalid_block(&chain, 1), Some((2, ChainFault::BrokenLink)));
    }

    #[test]
    fn genesis_must_point_at_sentinel() {
        let mut chain = sealed_chain(2, 1);
        chain[0].previous_hash = "0".to_string();
        let hash = seal(&mut chain[0], 1);
        chain[0].hash = Some(hash);
        assert_eq!(find_invalid_block(&chain, 1), Some((0, ChainFault::BrokenLink)));
    }

    #[test]
    fn detects_out_of_place_index() {
        // Resealed and relinked, but numbered 7 at position 1.
        let mut chain = sealed_chain(2, 1);
        chain[1].index = 7;
        let hash = seal(&mut chain[1], 1);
        chain[1].hash = Some(hash);
        assert_eq!(find_invalid_block(&chain, 1), Some((1, ChainFault::BadIndex)));
        assert!(!check_chain_validity(&chain, 1));
    }

    #[test]
    fn stops_at_first_fault() {
        let mut chain = sealed_chain(4, 1);
        chain[1].hash = None;
        chain[3].transactions.clear();
        assert_eq!(find_invalid_block(&chain, 1), Some((1, ChainFault::MissingHash)));
    }
}
