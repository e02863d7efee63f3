use async_trait::async_trait;
use forge_core::Block;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A peer's answer to "what is your chain?".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteChain {
    /// Length as reported by the peer
    pub length: usize,
    pub chain: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("Peer {peer} answered with status {status}")]
    BadStatus { peer: String, status: u16 },

    #[error("Peer {peer} sent a malformed chain: {reason}")]
    Malformed { peer: String, reason: String },
}

/// Transport capability used by consensus resolution to read a peer's chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<RemoteChain, FetchError>;
}
