pub mod hashing;
pub mod sig_simulator;

pub use hashing::sha256_hex;
pub use sig_simulator::{CryptoError, KeyPair, SignatureSimulator, MAX_KEY_ATTEMPTS};
