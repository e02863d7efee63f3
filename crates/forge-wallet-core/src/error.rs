use forge_consensus::ConsensusError;
use forge_crypto::CryptoError;
use thiserror::Error;

/// Rejections surfaced by entity operations. Each one aborts the operation
/// before any fork is returned.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("{entity}: insufficient balance ({held} held, {requested} requested)")]
    InsufficientFunds {
        entity: String,
        held: i128,
        requested: u64,
    },

    #[error("Address {address} has negative balance {balance}")]
    LedgerCorruption { address: String, balance: i128 },

    #[error("Transfer overpaid: remaining amount went to {remaining}")]
    AccountingInvariantViolation { remaining: i128 },

    #[error("Key minting failed: {0}")]
    KeyCollision(#[from] CryptoError),

    #[error("Mining failed: {0}")]
    Mining(#[from] ConsensusError),
}
