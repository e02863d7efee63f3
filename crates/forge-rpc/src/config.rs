use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use forge_core::{DEFAULT_DIFFICULTY, DEFAULT_GENESIS_PROOF};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Environment variables with this prefix override file settings,
/// e.g. `FORGE_PORT=5001` or `FORGE_GENESIS_PROOF=7`.
pub const ENV_PREFIX: &str = "FORGE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub listen_addr: String,
    pub port: u16,
    pub difficulty: usize,
    pub genesis_proof: u64,
    /// Proof-of-work threads; 0 means one per CPU
    pub pow_workers: usize,
    pub fetch_timeout_secs: u64,
    pub peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 5000,
            difficulty: DEFAULT_DIFFICULTY,
            genesis_proof: DEFAULT_GENESIS_PROOF,
            pow_workers: 0,
            fetch_timeout_secs: 5,
            peers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "forge-node")]
#[command(about = "Forge ledger node", long_about = None)]
pub struct NodeArgs {
    /// Configuration file (toml, yaml or json)
    #[arg(long)]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Leading zero hex digits required of each proof
    #[arg(long)]
    pub difficulty: Option<usize>,

    /// Proof sealed into the genesis block
    #[arg(long)]
    pub genesis_proof: Option<u64>,

    /// Proof-of-work worker threads (0 = one per CPU)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Peer to register at startup; may be repeated
    #[arg(long = "peer")]
    pub peers: Vec<String>,
}

impl NodeConfig {
    /// Defaults, then the config file, then `FORGE_*` variables, then flags.
    pub fn load(args: &NodeArgs) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&NodeConfig::default())?);

        if let Some(path) = &args.config {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("peers"),
        );

        let mut config: NodeConfig = builder.build()?.try_deserialize()?;
        config.apply(args);
        Ok(config)
    }

    fn apply(&mut self, args: &NodeArgs) {
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(difficulty) = args.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(genesis_proof) = args.genesis_proof {
            self.genesis_proof = genesis_proof;
        }
        if let Some(workers) = args.workers {
            self.pow_workers = workers;
        }
        self.peers.extend(args.peers.iter().cloned());
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let ip: IpAddr = self.listen_addr.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
