// TWO-NODE INTEGRATION TEST
// Real HTTP between two in-process nodes on ephemeral ports.

use forge_consensus::PowEngine;
use forge_core::Ledger;
use forge_rpc::{routes, HttpChainFetcher, NodeContext};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

fn spawn_node(ledger: Ledger) -> (Arc<NodeContext>, SocketAddr) {
    let pow = Arc::new(PowEngine::new(1).unwrap());
    let fetcher = HttpChainFetcher::new(Duration::from_secs(2)).unwrap();
    let ctx = Arc::new(NodeContext::new(ledger, pow, Arc::new(fetcher)));
    let (addr, server) = warp::serve(routes(ctx.clone())).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (ctx, addr)
}

#[tokio::test]
async fn test_follower_adopts_longer_chain_over_http() {
    let genesis = Ledger::new(100, 1);
    let (leader, leader_addr) = spawn_node(genesis.clone());
    let (follower, _) = spawn_node(genesis);

    for _ in 0..3 {
        leader.mine().await.unwrap();
    }

    follower
        .register_nodes(&[format!("http://{}", leader_addr)])
        .unwrap();
    let (replaced, chain) = follower.resolve().await.unwrap();
    assert!(replaced);
    assert_eq!(chain.len(), 4);
    assert_eq!(chain, leader.chain().await.0);
}

#[tokio::test]
async fn test_unreachable_peer_is_skipped() {
    let (node, _) = spawn_node(Ledger::new(100, 1));
    // Nothing listens on port 9 of the loopback.
    node.register_nodes(&["127.0.0.1:9".to_string()]).unwrap();

    let (replaced, chain) = node.resolve().await.unwrap();
    assert!(!replaced);
    assert_eq!(chain.len(), 1);
}
