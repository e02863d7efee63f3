// === Node Configuration ===
pub mod config;

// === Node State & Transport ===
pub mod fetcher;
pub mod node;

// === HTTP Surface ===
pub mod http;

pub use config::{NodeArgs, NodeConfig};
pub use fetcher::HttpChainFetcher;
pub use http::routes;
pub use node::{NodeContext, NodeError};
