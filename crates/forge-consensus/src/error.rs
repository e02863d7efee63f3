use thiserror::Error;

/// Consensus-layer errors.
///
/// Validation failures of candidate chains are NOT errors: they are reported
/// through `ChainViolation` and silently discarded during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// The search was cancelled before a proof was found
    #[error("Proof-of-work search cancelled")]
    MiningCancelled,

    /// No hex digest has more than 64 characters, so no proof can exist
    #[error("Difficulty {difficulty} exceeds the {max} hex digits of a digest")]
    DifficultyOutOfRange { difficulty: usize, max: usize },

    /// Every u64 nonce was tried without success
    #[error("Nonce space exhausted without a valid proof")]
    ProofSpaceExhausted,

    #[error("Failed to build proof-of-work worker pool: {0}")]
    WorkerPool(String),

    #[error("Invalid peer address {address:?}: {reason}")]
    InvalidPeerAddress { address: String, reason: String },
}
