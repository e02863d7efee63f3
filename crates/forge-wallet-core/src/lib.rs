pub mod account_ledger;
pub mod entity;
pub mod error;

pub use account_ledger::{balance, Balance, VerificationMode};
pub use entity::Entity;
pub use error::WalletError;
