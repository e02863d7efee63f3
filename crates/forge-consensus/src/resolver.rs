// CONSENSUS RESOLVER
// Longest-valid-chain reconciliation against the known peer set.
//
// SAFETY INVARIANTS:
// 1. A candidate replaces the running best only if it is STRICTLY longer
//    than both the running best and the local chain; ties never replace
// 2. Every accepted candidate passed `ChainValidator` in silent mode
// 3. Unreachable, erroring or malformed peers are skipped; one bad peer
//    never aborts the pass
// 4. The local length is frozen when the pass starts, and the swap is a
//    single assignment of the winning chain

use crate::chain_validator::{ChainValidator, Verbosity};
use crate::error::ConsensusError;
use crate::fetcher::ChainFetcher;
use crate::peer::canonical_peer_address;
use forge_core::{Block, Ledger};
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ConsensusResolver {
    peers: HashSet<String>,
}

impl ConsensusResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer under its canonical `host:port` form.
    /// Registering the same peer twice is a no-op.
    pub fn register_node(&mut self, address: &str) -> Result<String, ConsensusError> {
        let canonical = canonical_peer_address(address)?;
        if self.peers.insert(canonical.clone()) {
            info!("Registered peer {}", canonical);
        }
        Ok(canonical)
    }

    /// Sorted snapshot of the peer set.
    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.peers.iter().cloned().collect();
        peers.sort();
        peers
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Replace the ledger's chain with the longest valid peer chain, if one
    /// is strictly longer. Returns whether a replacement happened.
    pub async fn resolve_conflicts(&self, ledger: &mut Ledger, fetcher: &dyn ChainFetcher) -> bool {
        let peers = self.peers();
        let candidate = select_candidate(&peers, ledger.len(), ledger.difficulty(), fetcher).await;

        match candidate {
            Some(chain) => match ledger.replace_chain(chain) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Candidate chain not adopted: {}", e);
                    false
                }
            },
            None => false,
        }
    }
}

/// Fetch every peer's chain and return the longest valid one that beats
/// `local_len`, without touching any ledger.
///
/// Fetches run concurrently; candidates are then judged one by one.
pub async fn select_candidate(
    peers: &[String],
    local_len: usize,
    difficulty: usize,
    fetcher: &dyn ChainFetcher,
) -> Option<Vec<Block>> {
    let responses = join_all(peers.iter().map(|peer| fetcher.fetch_chain(peer))).await;

    let mut max_length = local_len;
    let mut best = None;

    for (peer, response) in peers.iter().zip(responses) {
        let remote = match response {
            Ok(remote) => remote,
            Err(e) => {
                warn!("Skipping peer {}: {}", peer, e);
                continue;
            }
        };

        if remote.length != remote.chain.len() {
            warn!(
                "Skipping peer {}: reported length {} but sent {} block(s)",
                peer,
                remote.length,
                remote.chain.len()
            );
            continue;
        }

        if remote.length > max_length
            && ChainValidator::is_valid(&remote.chain, difficulty, Verbosity::Silent)
        {
            debug!("Peer {} offers valid chain of length {}", peer, remote.length);
            max_length = remote.length;
            best = Some(remote.chain);
        }
    }

    best
}
