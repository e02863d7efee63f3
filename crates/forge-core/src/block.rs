use crate::canonical::to_canonical_string;
use forge_crypto::sha256_hex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// The value a sender committed to when authenticating a transfer.
///
/// Transfers built by wallets commit to an integer Unix timestamp; values
/// arriving from peers may also be strings. Both forms hash differently, so
/// the distinction is kept rather than normalising to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignedMessage {
    Integer(i64),
    Text(String),
}

impl fmt::Display for SignedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignedMessage::Integer(n) => write!(f, "{}", n),
            SignedMessage::Text(s) => f.write_str(s),
        }
    }
}

impl SignedMessage {
    fn canonical_value(&self) -> Value {
        match self {
            SignedMessage::Integer(n) => json!(n),
            SignedMessage::Text(s) => json!(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    /// Commitment hash, present only together with `message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<SignedMessage>,
}

impl Transaction {
    /// Unauthenticated transfer (mining rewards, raw submissions).
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            signature: None,
            message: None,
        }
    }

    /// Builds a transfer, attaching the signature/message pair only when
    /// both halves are supplied.
    pub fn with_authentication(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
        signature: Option<String>,
        message: Option<SignedMessage>,
    ) -> Self {
        let mut tx = Self::new(sender, recipient, amount);
        if let (Some(signature), Some(message)) = (signature, message) {
            tx.signature = Some(signature);
            tx.message = Some(message);
        }
        tx
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some() && self.message.is_some()
    }

    fn canonical_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("sender".into(), json!(self.sender));
        map.insert("recipient".into(), json!(self.recipient));
        map.insert("amount".into(), json!(self.amount));
        if let (Some(signature), Some(message)) = (&self.signature, &self.message) {
            map.insert("signature".into(), json!(signature));
            map.insert("message".into(), message.canonical_value());
        }
        Value::Object(map)
    }
}

/// A sealed block.
///
/// Blocks are immutable once appended; the only sanctioned mutation path is
/// `Ledger::block_mut`, which exists for adversarial tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position in the chain
    pub index: u64,

    /// Seconds since the Unix epoch, microsecond resolution
    pub timestamp: f64,

    pub transactions: Vec<Transaction>,

    /// Proof-of-work nonce
    pub proof: u64,

    /// Hash of the preceding block, or the genesis sentinel
    pub previous_hash: String,
}

impl Block {
    /// Canonical JSON document this block hashes over.
    pub fn canonical_json(&self) -> String {
        let transactions: Vec<Value> = self
            .transactions
            .iter()
            .map(Transaction::canonical_value)
            .collect();
        let value = json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": transactions,
            "proof": self.proof,
            "previous_hash": self.previous_hash,
        });
        to_canonical_string(&value)
    }

    /// SHA-256 of the canonical JSON, hex encoded.
    pub fn hash(&self) -> String {
        sha256_hex(self.canonical_json().as_bytes())
    }
}
