// === Ledger Primitives ===
pub use forge_core as ledger;
pub use forge_crypto as crypto;

// === Consensus ===
pub use forge_consensus as consensus;

// === Accounts & Entities ===
pub use forge_wallet_core as wallet;

// === Node Service ===
pub use forge_rpc as rpc;
