use crate::node::{NodeContext, NodeError};
use forge_consensus::ConsensusError;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// Body of `POST /transactions/new`. Fields are optional so a missing one
/// can be answered with 400 "Missing values".
#[derive(Debug, Deserialize)]
struct NewTransactionRequest {
    sender: Option<String>,
    recipient: Option<String>,
    amount: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RegisterNodesRequest {
    nodes: Option<Vec<String>>,
}

fn with_context(
    ctx: Arc<NodeContext>,
) -> impl Filter<Extract = (Arc<NodeContext>,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn status_json(value: serde_json::Value, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(&value), status).into_response()
}

async fn handle_mine(ctx: Arc<NodeContext>) -> Result<Response, Infallible> {
    match ctx.mine().await {
        Ok(block) => Ok(status_json(
            json!({
                "message": "New Block Forged",
                "index": block.index,
                "transactions": block.transactions,
                "proof": block.proof,
                "previous_hash": block.previous_hash,
            }),
            StatusCode::OK,
        )),
        Err(e @ NodeError::Stale) | Err(e @ NodeError::Mining(ConsensusError::MiningCancelled)) => {
            info!("Mining abandoned: {}", e);
            Ok(status_json(json!({ "message": e.to_string() }), StatusCode::CONFLICT))
        }
        Err(e) => {
            error!("Mining failed: {}", e);
            Ok(status_json(
                json!({ "message": e.to_string() }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn handle_new_transaction(
    req: NewTransactionRequest,
    ctx: Arc<NodeContext>,
) -> Result<Response, Infallible> {
    let (sender, recipient, amount) = match (req.sender, req.recipient, req.amount) {
        (Some(sender), Some(recipient), Some(amount)) => (sender, recipient, amount),
        _ => {
            return Ok(
                warp::reply::with_status("Missing values", StatusCode::BAD_REQUEST).into_response(),
            )
        }
    };

    let index = ctx.new_transaction(&sender, &recipient, amount).await;
    Ok(status_json(
        json!({ "message": format!("Transaction will be added to Block {}", index) }),
        StatusCode::CREATED,
    ))
}

async fn handle_chain(ctx: Arc<NodeContext>) -> Result<Response, Infallible> {
    let (chain, length) = ctx.chain().await;
    Ok(status_json(json!({ "chain": chain, "length": length }), StatusCode::OK))
}

async fn handle_register(
    req: RegisterNodesRequest,
    ctx: Arc<NodeContext>,
) -> Result<Response, Infallible> {
    let nodes = req.nodes.unwrap_or_default();
    match ctx.register_nodes(&nodes) {
        Ok(peers) => Ok(status_json(
            json!({ "message": "New nodes have been added", "total_nodes": peers }),
            StatusCode::CREATED,
        )),
        Err(e) => Ok(warp::reply::with_status(format!("Error: {}", e), StatusCode::BAD_REQUEST)
            .into_response()),
    }
}

async fn handle_resolve(ctx: Arc<NodeContext>) -> Result<Response, Infallible> {
    match ctx.resolve().await {
        Ok((true, chain)) => Ok(status_json(
            json!({ "message": "Our chain was replaced", "new_chain": chain }),
            StatusCode::OK,
        )),
        Ok((false, chain)) => Ok(status_json(
            json!({ "message": "Our chain is authoritative", "chain": chain }),
            StatusCode::OK,
        )),
        Err(e) => {
            error!("Resolution failed: {}", e);
            Ok(status_json(
                json!({ "message": e.to_string() }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

/// Every endpoint of a node, logged under the `forge_rpc` target.
pub fn routes(
    ctx: Arc<NodeContext>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let mine = warp::path!("mine")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handle_mine);

    let new_transaction = warp::path!("transactions" / "new")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(handle_new_transaction);

    let chain = warp::path!("chain")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handle_chain);

    let register = warp::path!("nodes" / "register")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_context(ctx.clone()))
        .and_then(handle_register);

    let resolve = warp::path!("nodes" / "resolve")
        .and(warp::get())
        .and(with_context(ctx))
        .and_then(handle_resolve);

    mine.or(new_transaction)
        .unify()
        .or(chain)
        .unify()
        .or(register)
        .unify()
        .or(resolve)
        .unify()
        .with(warp::log("forge_rpc"))
}
