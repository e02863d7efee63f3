use anyhow::{Context, Result};
use clap::Parser;
use forge_rpc::{routes, HttpChainFetcher, NodeArgs, NodeConfig, NodeContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = NodeArgs::parse();
    let config = NodeConfig::load(&args).context("loading node configuration")?;
    let addr = config
        .socket_addr()
        .with_context(|| format!("invalid listen address {:?}", config.listen_addr))?;

    let fetcher = HttpChainFetcher::new(Duration::from_secs(config.fetch_timeout_secs))
        .context("building peer HTTP client")?;
    let ctx = Arc::new(NodeContext::from_config(&config, Arc::new(fetcher))?);

    info!(
        "Forge node {} listening on http://{} (difficulty {}, {} pow worker(s), {} peer(s))",
        ctx.node_id(),
        addr,
        config.difficulty,
        ctx.pow().workers(),
        ctx.peers().len()
    );
    warp::serve(routes(ctx)).run(addr).await;
    Ok(())
}
