// ENTITY
// An actor holding keys on a signature simulator, composing balance replay,
// proof-of-work and ledger forks into pay / mine / forge / validate.
//
// SAFETY INVARIANTS:
// 1. Every operation works on a clone; the ledger passed in is never
//    mutated. A result takes effect only when the caller adopts it
// 2. Private identifiers never leave the entity (Debug prints addresses only)
// 3. A rejected transfer returns an error and no fork at all

use crate::account_ledger::{self, Balance, VerificationMode};
use crate::error::WalletError;
use forge_consensus::{CancellationToken, ChainValidator, PowEngine, Verbosity};
use forge_core::{Ledger, SignedMessage};
use forge_crypto::SignatureSimulator;
use log::{debug, info, warn};
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Sender recorded on rewards produced by `Entity::mine`.
pub const MINE_REWARD_SENDER: &str = "from mine";
pub const MINE_REWARD: u64 = 1;

pub struct Entity {
    name: String,
    /// public -> private
    keys: BTreeMap<String, String>,
    simulator: Arc<SignatureSimulator>,
    pow: Arc<PowEngine>,
    verification: VerificationMode,
}

impl Entity {
    /// Entity with a simulator of its own.
    pub fn new(name: impl Into<String>, pow: Arc<PowEngine>) -> Self {
        Self::with_simulator(name, Arc::new(SignatureSimulator::new()), pow)
    }

    /// Entity minting keys on a shared simulator; entities sharing one can
    /// verify each other's commitments.
    pub fn with_simulator(
        name: impl Into<String>,
        simulator: Arc<SignatureSimulator>,
        pow: Arc<PowEngine>,
    ) -> Self {
        Self {
            name: name.into(),
            keys: BTreeMap::new(),
            simulator,
            pow,
            verification: VerificationMode::default(),
        }
    }

    pub fn with_verification(mut self, mode: VerificationMode) -> Self {
        self.verification = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owned public addresses in lexicographic order.
    pub fn addresses(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }

    pub fn owns(&self, address: &str) -> bool {
        self.keys.contains_key(address)
    }

    pub fn simulator(&self) -> &Arc<SignatureSimulator> {
        &self.simulator
    }

    pub fn pow(&self) -> &Arc<PowEngine> {
        &self.pow
    }

    /// Mint a key pair, keep the private half, hand out the public one.
    pub fn new_address(&mut self) -> Result<String, WalletError> {
        let pair = self.simulator.key_pair()?;
        debug!("{} minted address {}", self.name, pair.public);
        self.keys.insert(pair.public.clone(), pair.private);
        Ok(pair.public)
    }

    /// Mint `count` addresses, keeping them only if every mint succeeds.
    pub fn new_addresses(&mut self, count: usize) -> Result<Vec<String>, WalletError> {
        let pairs = (0..count)
            .map(|_| self.simulator.key_pair())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs
            .into_iter()
            .map(|pair| {
                debug!("{} minted address {}", self.name, pair.public);
                self.keys.insert(pair.public.clone(), pair.private);
                pair.public
            })
            .collect())
    }

    pub fn balance(&self, ledger: &Ledger) -> Balance {
        account_ledger::balance(ledger.chain(), &self.keys, &self.simulator, self.verification)
    }

    /// Pay `amount` to fresh addresses of `recipient` on a fork of `ledger`.
    ///
    /// Owned addresses are drained in lexicographic order, one signed
    /// transaction per address consumed, then the fork is sealed with
    /// proof-of-work. A zero amount seals an empty block. On any error the
    /// recipient's keys are left as they were.
    pub fn gives(
        &self,
        ledger: &Ledger,
        recipient: &mut Entity,
        amount: u64,
    ) -> Result<Ledger, WalletError> {
        let held = self.balance(ledger);
        let requested = i128::from(amount);

        if requested > held.total {
            warn!("{} cannot pay {}: holds {}", self.name, amount, held.total);
            return Err(WalletError::InsufficientFunds {
                entity: self.name.clone(),
                held: held.total,
                requested: amount,
            });
        }

        if let Some((address, &balance)) = held.by_address.iter().find(|(_, b)| **b < 0) {
            return Err(WalletError::LedgerCorruption {
                address: address.clone(),
                balance,
            });
        }

        let mut due = requested;
        let mut payments: Vec<(&String, &String, u64)> = Vec::new();

        for (payer, &coins) in &held.by_address {
            if due == 0 {
                break;
            }
            if coins == 0 {
                continue;
            }

            let pay = due.min(coins);
            due -= pay;
            if due < 0 {
                return Err(WalletError::AccountingInvariantViolation { remaining: due });
            }

            let private = match self.keys.get(payer) {
                Some(private) => private,
                None => continue,
            };
            // `pay` is bounded by `requested`, which came from a u64.
            let pay = u64::try_from(pay)
                .map_err(|_| WalletError::AccountingInvariantViolation { remaining: due })?;
            payments.push((payer, private, pay));
        }

        if due != 0 {
            return Err(WalletError::AccountingInvariantViolation { remaining: due });
        }

        // The proof depends only on the tip, so it is found before the
        // recipient is asked for any address.
        let mut fork = ledger.clone();
        let previous_hash = Ledger::hash(fork.last_block());
        let proof = self.pow.work_for_proof(&fork, &CancellationToken::new())?;
        let destinations = recipient.new_addresses(payments.len())?;

        for ((payer, private, pay), to) in payments.into_iter().zip(destinations) {
            let message = SignedMessage::Integer(chrono::Utc::now().timestamp());
            let signature = SignatureSimulator::commit(private, &message.to_string());
            fork.new_transaction(payer.clone(), to, pay, Some(signature), Some(message));
        }
        fork.new_block(proof, Some(previous_hash));

        info!(
            "{} gives {} to {} (fork length {})",
            self.name,
            amount,
            recipient.name,
            fork.len()
        );
        Ok(fork)
    }

    /// Mine one block on a fork of `ledger`, rewarding a fresh address.
    ///
    /// With `speed = Some(s)`, the attempt is skipped with probability
    /// `1 - 1/s` and `Ok(None)` is returned.
    pub fn mine(
        &mut self,
        ledger: &Ledger,
        speed: Option<f64>,
    ) -> Result<Option<Ledger>, WalletError> {
        self.mine_with_rng(ledger, speed, &mut rand::thread_rng())
    }

    pub fn mine_with_rng<R: Rng + ?Sized>(
        &mut self,
        ledger: &Ledger,
        speed: Option<f64>,
        rng: &mut R,
    ) -> Result<Option<Ledger>, WalletError> {
        if let Some(speed) = speed.filter(|s| *s > 0.0) {
            if rng.gen::<f64>() > 1.0 / speed {
                debug!("{} skipped a mining round (speed {})", self.name, speed);
                return Ok(None);
            }
        }

        let mut fork = ledger.clone();
        let reward_to = self.new_address()?;
        fork.new_transaction(MINE_REWARD_SENDER, reward_to, MINE_REWARD, None, None);
        self.seal(&mut fork)?;
        info!("{} mined block {}", self.name, fork.last_block().index);
        Ok(Some(fork))
    }

    /// Fork in which the first sealed block carrying a transaction gets a
    /// copy of that transaction redirected to one of our addresses.
    ///
    /// Only adjacent hash links and proofs are checked by validation, so
    /// tampering with the tip block goes unnoticed; tampering with an
    /// earlier block breaks the link from its successor.
    pub fn some_fake(&mut self, ledger: &Ledger) -> Result<Ledger, WalletError> {
        let mut faked = ledger.clone();
        let target = faked
            .chain()
            .iter()
            .position(|block| block.transactions.iter().any(|tx| !tx.recipient.is_empty()));

        let position = match target {
            Some(position) => position,
            None => return Ok(faked),
        };

        let recipient = self.new_address()?;
        if let Some(block) = faked.block_mut(position) {
            if let Some(source) = block.transactions.iter().find(|tx| !tx.recipient.is_empty()) {
                let mut forged = source.clone();
                forged.recipient = recipient;
                block.transactions.push(forged);
                warn!("{} forged block {}", self.name, block.index);
            }
        }
        Ok(faked)
    }

    pub fn validate_blockchain(&self, ledger: &Ledger) -> String {
        let valid = ChainValidator::is_valid(ledger.chain(), ledger.difficulty(), Verbosity::Silent);
        let action = if valid { "accepts" } else { "rejects" };
        format!("{} {} the blockchain", self.name, action)
    }

    fn seal(&self, fork: &mut Ledger) -> Result<(), WalletError> {
        let previous_hash = Ledger::hash(fork.last_block());
        let proof = self.pow.work_for_proof(fork, &CancellationToken::new())?;
        fork.new_block(proof, Some(previous_hash));
        Ok(())
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("addresses", &self.keys.keys().collect::<Vec<_>>())
            .field("verification", &self.verification)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_consensus::{ConsensusError, MAX_DIFFICULTY};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> Arc<PowEngine> {
        Arc::new(PowEngine::new(1).unwrap())
    }

    #[test]
    fn test_mine_rewards_fresh_address() {
        let mut alice = Entity::new("alice", engine());
        let ledger = Ledger::new(100, 1);

        let fork = alice.mine(&ledger, None).unwrap().unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(fork.len(), 2);

        let reward = &fork.last_block().transactions[0];
        assert_eq!(reward.sender, MINE_REWARD_SENDER);
        assert_eq!(reward.amount, MINE_REWARD);
        assert!(alice.owns(&reward.recipient));
        assert_eq!(alice.validate_blockchain(&fork), "alice accepts the blockchain");
    }

    #[test]
    fn test_slow_miner_skips_rounds() {
        let mut slow = Entity::new("slow", engine());
        let ledger = Ledger::new(100, 0);
        let mut rng = StdRng::seed_from_u64(7);

        let produced = (0..200)
            .filter(|_| slow.mine_with_rng(&ledger, Some(1_000.0), &mut rng).unwrap().is_some())
            .count();
        assert!(produced < 20, "produced {} blocks", produced);
    }

    #[test]
    fn test_speed_one_never_skips() {
        let mut fast = Entity::new("fast", engine());
        let ledger = Ledger::new(100, 0);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert!(fast.mine_with_rng(&ledger, Some(1.0), &mut rng).unwrap().is_some());
        }
    }

    #[test]
    fn test_gives_moves_funds_on_fork_only() {
        let pow = engine();
        let mut alice = Entity::new("alice", pow.clone());
        let mut bob = Entity::new("bob", pow);

        let mut ledger = Ledger::new(100, 1);
        for _ in 0..3 {
            ledger = alice.mine(&ledger, None).unwrap().unwrap();
        }
        assert_eq!(alice.balance(&ledger).total, 3);

        let fork = alice.gives(&ledger, &mut bob, 2).unwrap();
        assert_eq!(fork.len(), ledger.len() + 1);
        assert_eq!(alice.balance(&fork).total, 1);
        assert_eq!(bob.balance(&fork).total, 2);

        // Source ledger untouched.
        assert_eq!(alice.balance(&ledger).total, 3);
        assert_eq!(bob.balance(&ledger).total, 0);

        let sealed = &fork.last_block().transactions;
        assert_eq!(sealed.len(), 2);
        assert!(sealed.iter().all(|tx| tx.is_signed() && tx.amount == 1));
        assert!(sealed.iter().all(|tx| bob.owns(&tx.recipient)));
    }

    #[test]
    fn test_gives_rejects_overdraft() {
        let pow = engine();
        let mut alice = Entity::new("alice", pow.clone());
        let mut bob = Entity::new("bob", pow);
        let ledger = alice.mine(&Ledger::new(100, 1), None).unwrap().unwrap();

        let err = alice.gives(&ledger, &mut bob, 2).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds { held: 1, requested: 2, .. }
        ));
        assert!(bob.addresses().is_empty());
    }

    #[test]
    fn test_gives_zero_seals_empty_block() {
        let pow = engine();
        let mut alice = Entity::new("alice", pow.clone());
        let mut bob = Entity::new("bob", pow);
        let ledger = alice.mine(&Ledger::new(100, 1), None).unwrap().unwrap();

        let fork = alice.gives(&ledger, &mut bob, 0).unwrap();
        assert_eq!(fork.len(), ledger.len() + 1);
        assert!(fork.last_block().transactions.is_empty());
        assert!(bob.addresses().is_empty());
        assert_eq!(alice.balance(&fork).total, 1);
    }

    #[test]
    fn test_failed_seal_leaves_recipient_keys_untouched() {
        let pow = engine();
        let mut alice = Entity::new("alice", pow.clone());
        let mut bob = Entity::new("bob", pow);

        let x = alice.new_address().unwrap();
        let mut ledger = Ledger::new(100, MAX_DIFFICULTY + 1);
        ledger.new_transaction("0", x, 5, None, None);
        ledger.new_block(0, None);

        let err = alice.gives(&ledger, &mut bob, 3).unwrap_err();
        assert!(matches!(
            err,
            WalletError::Mining(ConsensusError::DifficultyOutOfRange { .. })
        ));
        assert!(bob.addresses().is_empty());
    }

    #[test]
    fn test_gives_rejects_negative_address() {
        let pow = engine();
        let mut alice = Entity::new("alice", pow.clone());
        let mut bob = Entity::new("bob", pow);

        let rich = alice.new_address().unwrap();
        let broke = alice.new_address().unwrap();
        let mut ledger = Ledger::new(100, 0);
        ledger.new_transaction("0", rich, 5, None, None);
        ledger.new_transaction(broke, "elsewhere", 2, None, None);
        ledger.new_block(0, None);

        let err = alice.gives(&ledger, &mut bob, 1).unwrap_err();
        assert!(matches!(err, WalletError::LedgerCorruption { balance: -2, .. }));
    }

    #[test]
    fn test_recorded_mode_ignores_rewards() {
        let mut alice = Entity::new("alice", engine()).with_verification(VerificationMode::Recorded);
        let ledger = alice.mine(&Ledger::new(100, 1), None).unwrap().unwrap();
        assert_eq!(alice.balance(&ledger).total, 0);
    }

    #[test]
    fn test_fake_on_tip_is_accepted() {
        let pow = engine();
        let mut alice = Entity::new("alice", pow.clone());
        let mut mallory = Entity::new("mallory", pow);
        let ledger = alice.mine(&Ledger::new(100, 1), None).unwrap().unwrap();

        let faked = mallory.some_fake(&ledger).unwrap();
        assert_eq!(faked.chain()[1].transactions.len(), 2);
        assert_eq!(ledger.chain()[1].transactions.len(), 1);
        assert_eq!(mallory.validate_blockchain(&faked), "mallory accepts the blockchain");
        assert_eq!(mallory.balance(&faked).total, 1);
    }

    #[test]
    fn test_fake_below_tip_breaks_linkage() {
        let pow = engine();
        let mut alice = Entity::new("alice", pow.clone());
        let mut mallory = Entity::new("mallory", pow);
        let mut ledger = Ledger::new(100, 1);
        for _ in 0..2 {
            ledger = alice.mine(&ledger, None).unwrap().unwrap();
        }

        let faked = mallory.some_fake(&ledger).unwrap();
        assert_eq!(mallory.validate_blockchain(&faked), "mallory rejects the blockchain");
    }

    #[test]
    fn test_fake_without_transactions_is_plain_copy() {
        let mut mallory = Entity::new("mallory", engine());
        let ledger = Ledger::new(100, 1);
        let faked = mallory.some_fake(&ledger).unwrap();
        assert_eq!(faked.chain(), ledger.chain());
        assert!(mallory.addresses().is_empty());
    }

    #[test]
    fn test_debug_hides_private_keys() {
        let mut alice = Entity::new("alice", engine());
        alice.new_address().unwrap();
        let rendered = format!("{:?}", alice);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("private"));
    }
}
