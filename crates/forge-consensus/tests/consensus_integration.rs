// INTEGRATION TESTS FOR MINING, VALIDATION AND RECONCILIATION
// Exercises the public surface only: a network of in-memory nodes whose
// chains are served through a map-backed fetcher.

use async_trait::async_trait;
use forge_consensus::{
    valid_proof, CancellationToken, ChainFetcher, ChainValidator, ConsensusResolver, FetchError,
    PowEngine, RemoteChain, Verbosity,
};
use forge_core::Ledger;
use proptest::prelude::*;
use std::collections::HashMap;

struct MapFetcher {
    chains: HashMap<String, Ledger>,
}

#[async_trait]
impl ChainFetcher for MapFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<RemoteChain, FetchError> {
        match self.chains.get(peer) {
            Some(ledger) => Ok(RemoteChain {
                length: ledger.len(),
                chain: ledger.chain().to_vec(),
            }),
            None => Err(FetchError::Unreachable {
                peer: peer.to_string(),
                reason: "no route to host".into(),
            }),
        }
    }
}

fn mine_blocks(engine: &PowEngine, ledger: &mut Ledger, blocks: usize, miner: &str) {
    for _ in 0..blocks {
        let proof = engine
            .work_for_proof(ledger, &CancellationToken::new())
            .unwrap();
        ledger.new_transaction("0", miner, 1, None, None);
        let previous_hash = Ledger::hash(ledger.last_block());
        ledger.new_block(proof, Some(previous_hash));
    }
}

#[test]
fn test_mined_chain_validates_at_its_difficulty() {
    let engine = PowEngine::new(2).unwrap();
    let mut ledger = Ledger::new(100, 2);
    mine_blocks(&engine, &mut ledger, 3, "alice");

    assert_eq!(ledger.len(), 4);
    assert!(ChainValidator::is_valid(ledger.chain(), 2, Verbosity::Silent));
    assert_eq!(engine.searches(), 3);
    assert!(engine.mining_cost().is_some());
}

#[test]
fn test_known_proof_at_difficulty_four() {
    let engine = PowEngine::new(0).unwrap();
    assert_eq!(engine.search(100, 4).unwrap(), 35_293);
}

#[tokio::test]
async fn test_network_converges_on_longest_valid_chain() {
    let engine = PowEngine::new(2).unwrap();
    let genesis = Ledger::new(100, 1);

    let mut short = genesis.clone();
    mine_blocks(&engine, &mut short, 1, "short");
    let mut long = genesis.clone();
    mine_blocks(&engine, &mut long, 3, "long");
    let mut forged = genesis.clone();
    mine_blocks(&engine, &mut forged, 6, "forger");
    if let Some(block) = forged.block_mut(4) {
        block.transactions.clear();
    }

    let fetcher = MapFetcher {
        chains: HashMap::from([
            ("short:5000".to_string(), short),
            ("long:5000".to_string(), long.clone()),
            ("forged:5000".to_string(), forged),
        ]),
    };

    let mut resolver = ConsensusResolver::new();
    for peer in ["short:5000", "long:5000", "forged:5000", "gone:5000"] {
        resolver.register_node(peer).unwrap();
    }

    let mut local = genesis;
    assert!(resolver.resolve_conflicts(&mut local, &fetcher).await);
    assert_eq!(local.chain(), long.chain());

    // A second pass finds nothing strictly longer.
    assert!(!resolver.resolve_conflicts(&mut local, &fetcher).await);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_search_returns_smallest_valid_proof(last_proof in 0u64..1_000_000, difficulty in 0usize..=2) {
        let engine = PowEngine::new(0).unwrap();
        let proof = engine.search(last_proof, difficulty).unwrap();
        prop_assert!(valid_proof(last_proof, proof, difficulty));
        prop_assert!((0..proof).all(|p| !valid_proof(last_proof, p, difficulty)));
    }
}
