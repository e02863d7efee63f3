// LEDGER
// Owns the canonical chain and the pending-transaction buffer.
//
// SAFETY INVARIANTS:
// 1. The chain is never empty: construction seals a genesis block and
//    `replace_chain` refuses an empty candidate
// 2. block[0].previous_hash is the genesis sentinel; every block sealed
//    through `new_block` without an explicit hash links to Hash(last block)
// 3. `new_block` drains the whole pending buffer into the sealed block
// 4. `Clone` is a deep structural copy: a fork never shares mutable state
//    with its source

use crate::block::{Block, SignedMessage, Transaction};
use chrono::Utc;
use log::{debug, info};
use thiserror::Error;

/// previous_hash carried by every genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Leading zero hex digits required of a proof hash (mining rate).
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Proof sealed into the genesis block unless configured otherwise.
pub const DEFAULT_GENESIS_PROOF: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Cannot adopt an empty chain")]
    EmptyChain,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    difficulty: usize,
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

impl Ledger {
    /// Create a ledger holding only its genesis block.
    pub fn new(genesis_proof: u64, difficulty: usize) -> Self {
        let mut ledger = Ledger {
            chain: Vec::new(),
            pending: Vec::new(),
            difficulty,
        };
        ledger.new_block(genesis_proof, Some(GENESIS_PREVIOUS_HASH.to_string()));
        ledger
    }

    /// Queue a transaction for the next block.
    ///
    /// Returns the index of the block that will carry it. No validation of
    /// addresses or amounts happens here; callers own that.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
        signature: Option<String>,
        message: Option<SignedMessage>,
    ) -> u64 {
        let tx = Transaction::with_authentication(sender, recipient, amount, signature, message);
        debug!(
            "Queued transaction {} -> {} ({})",
            tx.sender, tx.recipient, tx.amount
        );
        self.pending.push(tx);
        self.last_block().index + 1
    }

    /// Seal the pending buffer into a new block and append it.
    ///
    /// A missing or empty `previous_hash` falls back to Hash(last block).
    /// Genesis construction is the only caller that must pass one.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> &Block {
        let previous_hash = match previous_hash {
            Some(hash) if !hash.is_empty() => hash,
            _ => Self::hash(self.last_block()),
        };

        let block = Block {
            index: self.chain.len() as u64 + 1,
            timestamp: now_seconds(),
            transactions: std::mem::take(&mut self.pending),
            proof,
            previous_hash,
        };

        info!(
            "Sealed block {} with {} transaction(s), proof={}",
            block.index,
            block.transactions.len(),
            block.proof
        );
        self.chain.push(block);
        self.last_block()
    }

    /// Canonical content hash of a block.
    pub fn hash(block: &Block) -> String {
        block.hash()
    }

    pub fn last_block(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// The i-th queued transaction, if any.
    pub fn pending_transaction(&self, index: usize) -> Option<&Transaction> {
        self.pending.get(index)
    }

    /// Number of sealed blocks.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false; a ledger carries at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Swap in a new canonical chain. Validation is the caller's job.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<(), LedgerError> {
        if chain.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        info!(
            "Replacing chain of length {} with chain of length {}",
            self.chain.len(),
            chain.len()
        );
        self.chain = chain;
        Ok(())
    }

    /// Mutable access to a sealed block.
    ///
    /// Only adversarial tooling should reach for this: editing a sealed
    /// block rewrites history.
    pub fn block_mut(&mut self, position: usize) -> Option<&mut Block> {
        self.chain.get_mut(position)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_GENESIS_PROOF, DEFAULT_DIFFICULTY)
    }
}
