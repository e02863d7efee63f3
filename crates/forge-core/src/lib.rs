// === Core Ledger Data ===
pub mod block;
pub mod blockchain;
pub mod canonical;

// === Re-exports for broader ecosystem access ===
pub use block::{Block, SignedMessage, Transaction};
pub use blockchain::{
    Ledger, LedgerError, DEFAULT_DIFFICULTY, DEFAULT_GENESIS_PROOF, GENESIS_PREVIOUS_HASH,
};
pub use canonical::{canonical_float, to_canonical_string};
