// ACCOUNT LEDGER
// Derives verified balances by replaying a chain from genesis.
//
// SAFETY INVARIANTS:
// 1. Full replay on every call: no cached or incremental balance state
// 2. A transaction that fails verification contributes exactly 0 to both
//    its sender and its recipient, even though it stays in the chain
// 3. Every owned address appears in the breakdown, zero or not

use forge_core::{Block, Transaction};
use forge_crypto::SignatureSimulator;
use log::trace;
use std::collections::BTreeMap;

/// How a transaction touching an owned address is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationMode {
    /// The owner proves control of the address by committing to a fresh
    /// challenge with the private half it holds. Passes for every address
    /// registered in the simulator under that private half, regardless of
    /// what the transaction itself recorded.
    #[default]
    Challenge,
    /// The transaction's recorded signature and message must verify
    /// against the SENDER's registered key. Unsigned transactions, mining
    /// rewards included, never count.
    Recorded,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Balance {
    /// Net sum over every owned address
    pub total: i128,
    pub by_address: BTreeMap<String, i128>,
}

impl Balance {
    pub fn of(&self, address: &str) -> i128 {
        self.by_address.get(address).copied().unwrap_or(0)
    }
}

fn challenge_message() -> String {
    let micros = chrono::Utc::now().timestamp_micros();
    format!("{}", micros as f64 / 1_000_000.0)
}

fn proves_control(
    simulator: &SignatureSimulator,
    public: &str,
    private: &str,
    message: &str,
) -> bool {
    let commit = SignatureSimulator::commit(private, message);
    simulator.verify(public, message, &commit)
}

fn recorded_signature_holds(simulator: &SignatureSimulator, tx: &Transaction) -> bool {
    match (&tx.signature, &tx.message) {
        (Some(signature), Some(message)) => {
            simulator.verify(&tx.sender, &message.to_string(), signature)
        }
        _ => false,
    }
}

/// Replay `chain` and return the verified balance of every address in
/// `keys` (public -> private).
pub fn balance(
    chain: &[Block],
    keys: &BTreeMap<String, String>,
    simulator: &SignatureSimulator,
    mode: VerificationMode,
) -> Balance {
    let mut by_address: BTreeMap<String, i128> =
        keys.keys().map(|public| (public.clone(), 0)).collect();

    for (public, private) in keys {
        let mut net = 0i128;
        for tx in chain.iter().flat_map(|block| block.transactions.iter()) {
            let amount = i128::from(tx.amount);

            if tx.sender == *public {
                let verified = match mode {
                    VerificationMode::Challenge => {
                        proves_control(simulator, public, private, &challenge_message())
                    }
                    VerificationMode::Recorded => recorded_signature_holds(simulator, tx),
                };
                if verified {
                    net -= amount;
                } else {
                    trace!("Unverified debit of {} from {} ignored", amount, public);
                }
            }

            if tx.recipient == *public {
                let verified = match mode {
                    VerificationMode::Challenge => {
                        let nonce = uuid::Uuid::new_v4().to_string();
                        proves_control(simulator, public, private, &nonce)
                    }
                    VerificationMode::Recorded => recorded_signature_holds(simulator, tx),
                };
                if verified {
                    net += amount;
                } else {
                    trace!("Unverified credit of {} to {} ignored", amount, public);
                }
            }
        }
        by_address.insert(public.clone(), net);
    }

    let total = by_address.values().sum();
    Balance { total, by_address }
}
