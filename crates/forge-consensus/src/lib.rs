pub mod chain_validator;
pub mod error;
pub mod fetcher;
pub mod peer;
pub mod pow_engine;
pub mod resolver;

pub use chain_validator::{partition_longest_valid, ChainValidator, ChainViolation, Verbosity};
pub use error::ConsensusError;
pub use fetcher::{ChainFetcher, FetchError, RemoteChain};
pub use peer::canonical_peer_address;
pub use pow_engine::{valid_proof, PowEngine, MAX_DIFFICULTY, SEARCH_BATCH};
pub use resolver::{select_candidate, ConsensusResolver};
pub use tokio_util::sync::CancellationToken;
