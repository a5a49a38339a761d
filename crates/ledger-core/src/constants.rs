pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Leading hex zeros a block digest must carry unless configured otherwise.
pub const DEFAULT_DIFFICULTY: u32 = 2;
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";
/// Nonces handed to rayon per round of the parallel search.
pub const NONCES_PER_BATCH: u64 = 1 << 14;
/// Sequential search polls its cancellation token once per this many nonces.
pub const CANCEL_CHECK_INTERVAL: u64 = 1 << 10;
