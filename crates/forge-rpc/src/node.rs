// NODE CONTEXT
// The one canonical ledger of a running node and the operations the HTTP
// layer exposes over it.
//
// SAFETY INVARIANTS:
// 1. Writes to the canonical chain are serialised by the ledger's write
//    lock; reads share a stable snapshot
// 2. Neither proof search nor peer fetching holds the write lock
// 3. A proof found against a tip that has since been replaced is never
//    sealed (`Stale`)
// 4. Adopting a peer chain cancels every in-flight proof search

use crate::config::NodeConfig;
use forge_consensus::{
    canonical_peer_address, select_candidate, CancellationToken, ChainFetcher, ConsensusError,
    ConsensusResolver, PowEngine,
};
use forge_core::{Block, Ledger, LedgerError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock as AsyncRwLock;
use tracing::{info, warn};

/// Sender recorded on block rewards minted by a node.
pub const REWARD_SENDER: &str = "0";
pub const REWARD_AMOUNT: u64 = 1;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Chain changed while mining; proof discarded")]
    Stale,

    #[error("Please supply a valid list of nodes")]
    NoNodes,

    #[error("Invalid peer: {0}")]
    InvalidPeer(ConsensusError),

    #[error("Mining failed: {0}")]
    Mining(#[from] ConsensusError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Worker task failed: {0}")]
    Task(String),
}

pub struct NodeContext {
    ledger: AsyncRwLock<Ledger>,
    resolver: RwLock<ConsensusResolver>,
    pow: Arc<PowEngine>,
    fetcher: Arc<dyn ChainFetcher>,
    node_id: String,
    mining: Mutex<CancellationToken>,
}

impl NodeContext {
    pub fn new(
        ledger: Ledger,
        pow: Arc<PowEngine>,
        fetcher: Arc<dyn ChainFetcher>,
    ) -> Self {
        let node_id = uuid::Uuid::new_v4().simple().to_string();
        info!("Node identifier {}", node_id);
        Self {
            ledger: AsyncRwLock::new(ledger),
            resolver: RwLock::new(ConsensusResolver::new()),
            pow,
            fetcher,
            node_id,
            mining: Mutex::new(CancellationToken::new()),
        }
    }

    /// Build a node from configuration and register its configured peers.
    pub fn from_config(
        config: &NodeConfig,
        fetcher: Arc<dyn ChainFetcher>,
    ) -> Result<Self, NodeError> {
        let pow = Arc::new(PowEngine::new(config.pow_workers)?);
        let ledger = Ledger::new(config.genesis_proof, config.difficulty);
        let node = Self::new(ledger, pow, fetcher);
        if !config.peers.is_empty() {
            node.register_nodes(&config.peers)?;
        }
        Ok(node)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn pow(&self) -> &Arc<PowEngine> {
        &self.pow
    }

    fn mining_token(&self) -> CancellationToken {
        let mut token = self.mining.lock();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        token.clone()
    }

    /// Search a proof on the blocking pool, then reward this node and seal.
    pub async fn mine(&self) -> Result<Block, NodeError> {
        let (last_proof, tip_hash, difficulty) = {
            let ledger = self.ledger.read().await;
            let last = ledger.last_block();
            (last.proof, Ledger::hash(last), ledger.difficulty())
        };

        let token = self.mining_token();
        let pow = self.pow.clone();
        let proof = tokio::task::spawn_blocking(move || {
            pow.search_cancellable(last_proof, difficulty, &token)
        })
        .await
        .map_err(|e| NodeError::Task(e.to_string()))??;

        let mut ledger = self.ledger.write().await;
        if Ledger::hash(ledger.last_block()) != tip_hash {
            warn!("Tip moved during proof search; discarding proof {}", proof);
            return Err(NodeError::Stale);
        }

        ledger.new_transaction(REWARD_SENDER, self.node_id.clone(), REWARD_AMOUNT, None, None);
        let block = ledger.new_block(proof, Some(tip_hash)).clone();
        info!("New block forged at index {}", block.index);
        Ok(block)
    }

    /// Queue an unauthenticated transaction; returns the target block index.
    pub async fn new_transaction(&self, sender: &str, recipient: &str, amount: u64) -> u64 {
        self.ledger
            .write()
            .await
            .new_transaction(sender, recipient, amount, None, None)
    }

    pub async fn chain(&self) -> (Vec<Block>, usize) {
        let ledger = self.ledger.read().await;
        (ledger.chain().to_vec(), ledger.len())
    }

    /// Register every address or none; returns the sorted peer set.
    pub fn register_nodes(&self, addresses: &[String]) -> Result<Vec<String>, NodeError> {
        if addresses.is_empty() {
            return Err(NodeError::NoNodes);
        }
        let canonical = addresses
            .iter()
            .map(|address| canonical_peer_address(address))
            .collect::<Result<Vec<_>, _>>()
            .map_err(NodeError::InvalidPeer)?;

        let mut resolver = self.resolver.write();
        for address in &canonical {
            resolver
                .register_node(address)
                .map_err(NodeError::InvalidPeer)?;
        }
        Ok(resolver.peers())
    }

    pub fn peers(&self) -> Vec<String> {
        self.resolver.read().peers()
    }

    /// Run one reconciliation pass. Returns whether the chain was replaced
    /// together with the chain as it stands afterwards.
    pub async fn resolve(&self) -> Result<(bool, Vec<Block>), NodeError> {
        let peers = self.peers();
        let (local_len, difficulty) = {
            let ledger = self.ledger.read().await;
            (ledger.len(), ledger.difficulty())
        };

        let candidate = select_candidate(&peers, local_len, difficulty, self.fetcher.as_ref()).await;

        let mut ledger = self.ledger.write().await;
        let replaced = match candidate {
            Some(chain) if chain.len() > ledger.len() => {
                ledger.replace_chain(chain)?;
                self.mining.lock().cancel();
                true
            }
            Some(_) => {
                warn!("Local chain grew during resolution; candidate dropped");
                false
            }
            None => false,
        };
        Ok((replaced, ledger.chain().to_vec()))
    }
}
