use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forge_cli::{run_simulation, SimulationParams};
use forge_consensus::{canonical_peer_address, ChainFetcher, ChainValidator, Verbosity};
use forge_core::DEFAULT_DIFFICULTY;
use forge_rpc::HttpChainFetcher;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forge-cli")]
#[command(about = "Forge ledger CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an in-memory mining race, transfer and forgery between entities
    Simulate {
        #[arg(long, default_value_t = 3)]
        entities: usize,
        #[arg(long, default_value_t = 8)]
        rounds: usize,
        #[arg(long, default_value_t = 3)]
        difficulty: usize,
        /// Speed increment between consecutive entities (higher is slower)
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        #[arg(long, default_value_t = 0)]
        workers: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Fetch a node's chain and validate it step by step
    Inspect {
        #[arg(long)]
        node: String,
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            entities,
            rounds,
            difficulty,
            speed,
            workers,
            seed,
        } => {
            let params = SimulationParams {
                entities,
                rounds,
                difficulty,
                speed_step: speed,
                workers,
                seed,
                ..SimulationParams::default()
            };
            let report = tokio::task::spawn_blocking(move || run_simulation(&params)).await??;

            for (i, producers) in report.rounds.iter().enumerate() {
                println!("round {:>3}: {}", i + 1, producers.join(", "));
            }
            println!("chain length: {}", report.chain_length);
            match &report.transfer {
                Ok(amount) => println!("transfer of {} accepted", amount),
                Err(reason) => println!("transfer rejected: {}", reason),
            }
            for verdict in &report.verdicts {
                println!("{}", verdict);
            }
            println!("after forgery:");
            for verdict in &report.fake_verdicts {
                println!("  {}", verdict);
            }
            for (name, total) in &report.balances {
                println!("{}: {}", name, total);
            }
            match report.mining_cost {
                Some(cost) => println!("mean accepted nonce: {:.1}", cost),
                None => println!("no proofs searched"),
            }
        }
        Commands::Inspect { node, difficulty } => {
            let peer = canonical_peer_address(&node)?;
            let fetcher = HttpChainFetcher::new(Duration::from_secs(10))
                .context("building HTTP client")?;
            let remote = fetcher.fetch_chain(&peer).await?;
            info!("{} reports length {}", peer, remote.length);

            match ChainValidator::validate(&remote.chain, difficulty, Verbosity::Verbose) {
                Ok(()) => println!("{}: chain of {} block(s) is valid", peer, remote.chain.len()),
                Err(violation) => {
                    error!("{}", violation);
                    println!("{}: chain rejected", peer);
                }
            }
        }
    }

    Ok(())
}
