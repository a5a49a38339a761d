use crate::{
    constants::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY},
    now_secs, pow,
    validate::{check_chain_validity, is_valid_proof},
    Block, LedgerError, Transaction,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The chain of sealed blocks plus the pool of transactions waiting to be mined.
///
/// The chain always holds at least the genesis block, and blocks are only
/// ever pushed onto the end of it.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    unconfirmed_transactions: Vec<Transaction>,
    difficulty: u32,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::create(DEFAULT_DIFFICULTY)
    }

    pub fn with_difficulty(difficulty: u32) -> Result<Self, LedgerError> {
        check_difficulty(difficulty)?;
        Ok(Self::create(difficulty))
    }

    /// Like [`Ledger::with_difficulty`], but the genesis search gives up once
    /// `cancel` fires. High difficulties can take arbitrarily long to seal.
    pub fn with_difficulty_until_cancelled(
        difficulty: u32,
        cancel: &CancellationToken,
    ) -> Result<Self, LedgerError> {
        check_difficulty(difficulty)?;
        let mut genesis = Block::genesis(now_secs());
        let hash = pow::seal_until_cancelled(&mut genesis, difficulty, cancel)?;
        Ok(Self::from_genesis(genesis, hash, difficulty))
    }

    fn create(difficulty: u32) -> Self {
        let mut genesis = Block::genesis(now_secs());
        let hash = pow::seal(&mut genesis, difficulty);
        Self::from_genesis(genesis, hash, difficulty)
    }

    fn from_genesis(mut genesis: Block, hash: String, difficulty: u32) -> Self {
        info!(difficulty, %hash, "created genesis block");
        genesis.hash = Some(hash);
        Self {
            chain: vec![genesis],
            unconfirmed_transactions: vec![],
            difficulty,
        }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Never true: genesis is created with the ledger.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn block(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    pub fn tip(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    fn tip_hash(&self) -> &str {
        self.tip().hash.as_deref().unwrap_or_default()
    }

    pub fn unconfirmed_transactions(&self) -> &[Transaction] {
        &self.unconfirmed_transactions
    }

    pub fn submit_transaction(&mut self, tx: Transaction) {
        self.unconfirmed_transactions.push(tx);
        debug!(
            pending = self.unconfirmed_transactions.len(),
            "transaction submitted"
        );
    }

    /// An unsealed block on top of the current tip carrying every pending
    /// transaction, or `None` when there is nothing to mine.
    pub fn candidate_block(&self) -> Option<Block> {
        if self.unconfirmed_transactions.is_empty() {
            return None;
        }
        let tip = self.tip();
        Some(Block::new(
            tip.index + 1,
            self.unconfirmed_transactions.clone(),
            now_secs(),
            self.tip_hash(),
        ))
    }

    /// Append a sealed block whose digest is `proof`. The chain is left
    /// unchanged when the block does not extend the tip at the next index or
    /// the proof fails.
    pub fn append_block(&mut self, mut block: Block, proof: String) -> Result<(), LedgerError> {
        if block.previous_hash != self.tip_hash() {
            warn!(index = block.index, "rejected block with stale previous_hash");
            return Err(LedgerError::InvalidLinkage {
                expected: self.tip_hash().to_string(),
                found: block.previous_hash,
            });
        }
        let expected = self.tip().index + 1;
        if block.index != expected {
            warn!(index = block.index, expected, "rejected block at wrong index");
            return Err(LedgerError::InvalidIndex {
                expected,
                found: block.index,
            });
        }
        if !is_valid_proof(&block, &proof, self.difficulty) {
            warn!(index = block.index, %proof, "rejected block with invalid proof");
            return Err(LedgerError::InvalidProof { index: block.index });
        }
        block.hash = Some(proof);
        self.chain.push(block);
        Ok(())
    }

    /// Append a block built by [`Ledger::candidate_block`] and drop the
    /// transactions it carries from the front of the pending pool.
    /// Transactions submitted after the candidate was taken stay pending.
    pub fn commit_block(&mut self, block: Block, proof: String) -> Result<u64, LedgerError> {
        let index = block.index;
        let included = block.transactions.len();
        let was_prefix = self.unconfirmed_transactions.starts_with(&block.transactions);
        self.append_block(block, proof)?;
        if was_prefix {
            self.unconfirmed_transactions.drain(..included);
        } else {
            warn!(index, "mined transactions no longer at the head of the pending pool");
        }
        info!(
            index,
            included,
            pending = self.unconfirmed_transactions.len(),
            "block appended"
        );
        Ok(index)
    }

    /// Mine every pending transaction into a new block.
    ///
    /// Returns `Ok(None)` when there is nothing to mine. If the sealed block
    /// is rejected it is dropped and the transactions stay pending.
    pub fn mine(&mut self) -> Result<Option<u64>, LedgerError> {
        let Some(mut block) = self.candidate_block() else {
            debug!("nothing to mine");
            return Ok(None);
        };
        let proof = pow::seal(&mut block, self.difficulty);
        self.commit_block(block, proof).map(Some)
    }

    /// [`Ledger::mine`] with a search that gives up once `cancel` fires.
    pub fn mine_until_cancelled(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<u64>, LedgerError> {
        let Some(mut block) = self.candidate_block() else {
            debug!("nothing to mine");
            return Ok(None);
        };
        let proof = pow::seal_until_cancelled(&mut block, self.difficulty, cancel)?;
        self.commit_block(block, proof).map(Some)
    }

    pub fn is_valid(&self) -> bool {
        check_chain_validity(&self.chain, self.difficulty)
    }
}

fn check_difficulty(difficulty: u32) -> Result<(), LedgerError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(LedgerError::DifficultyOutOfRange(difficulty));
    }
    Ok(())
}
