// PROOF-OF-WORK ENGINE
// Brute-force nonce search over a dedicated worker pool.
//
// SAFETY INVARIANTS:
// 1. `valid_proof` is the single source of truth: mining and validation
//    both call it, never a re-derived variant
// 2. The parallel search returns the SAME nonce a sequential scan from 0
//    would (the smallest satisfying one): batches are scanned in order and
//    each batch uses an ordered first-match
// 3. Cancellation is observed between batches; a cancelled search records
//    nothing in the statistics
// 4. Statistics are observational only and never feed into consensus

use crate::error::ConsensusError;
use forge_core::Ledger;
use forge_crypto::sha256_hex;
use log::{debug, info};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Nonces examined per parallel batch between cancellation checks.
pub const SEARCH_BATCH: u64 = 4_096;

/// A SHA-256 hex digest is 64 characters long.
pub const MAX_DIFFICULTY: usize = 64;

/// True iff SHA-256(decimal(last_proof) ++ decimal(proof)) starts with
/// `difficulty` hex zeros. Difficulty 0 accepts every proof.
pub fn valid_proof(last_proof: u64, proof: u64, difficulty: usize) -> bool {
    if difficulty > MAX_DIFFICULTY {
        return false;
    }
    let guess = format!("{}{}", last_proof, proof);
    let digest = sha256_hex(guess.as_bytes());
    digest.as_bytes()[..difficulty].iter().all(|&b| b == b'0')
}

pub struct PowEngine {
    pool: rayon::ThreadPool,
    proof_sum: AtomicU64,
    proof_count: AtomicU64,
}

impl PowEngine {
    /// Build an engine searching on `workers` threads (0 = one per CPU).
    pub fn new(workers: usize) -> Result<Self, ConsensusError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("forge-pow-{}", i))
            .build()
            .map_err(|e| ConsensusError::WorkerPool(e.to_string()))?;

        info!("Proof-of-work engine ready with {} worker(s)", pool.current_num_threads());
        Ok(Self {
            pool,
            proof_sum: AtomicU64::new(0),
            proof_count: AtomicU64::new(0),
        })
    }

    /// Search for the smallest proof satisfying `valid_proof`.
    pub fn search(&self, last_proof: u64, difficulty: usize) -> Result<u64, ConsensusError> {
        self.search_cancellable(last_proof, difficulty, &CancellationToken::new())
    }

    /// Like `search`, giving up with `MiningCancelled` once `cancel` fires.
    pub fn search_cancellable(
        &self,
        last_proof: u64,
        difficulty: usize,
        cancel: &CancellationToken,
    ) -> Result<u64, ConsensusError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ConsensusError::DifficultyOutOfRange {
                difficulty,
                max: MAX_DIFFICULTY,
            });
        }

        let mut start = 0u64;
        loop {
            if cancel.is_cancelled() {
                debug!("Search from last_proof={} cancelled at nonce {}", last_proof, start);
                return Err(ConsensusError::MiningCancelled);
            }

            let end = start.saturating_add(SEARCH_BATCH);
            let found = self.pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .find_first(|&proof| valid_proof(last_proof, proof, difficulty))
            });

            if let Some(proof) = found {
                self.proof_sum.fetch_add(proof, Ordering::Relaxed);
                self.proof_count.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Proof found: last_proof={}, proof={}, difficulty={}",
                    last_proof, proof, difficulty
                );
                return Ok(proof);
            }

            if end == u64::MAX {
                return Err(ConsensusError::ProofSpaceExhausted);
            }
            start = end;
        }
    }

    /// Proof for the block following the ledger's tip, at the ledger's difficulty.
    pub fn work_for_proof(
        &self,
        ledger: &Ledger,
        cancel: &CancellationToken,
    ) -> Result<u64, ConsensusError> {
        self.search_cancellable(ledger.last_block().proof, ledger.difficulty(), cancel)
    }

    /// Mean accepted nonce across completed searches.
    pub fn mining_cost(&self) -> Option<f64> {
        let count = self.proof_count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        Some(self.proof_sum.load(Ordering::Relaxed) as f64 / count as f64)
    }

    /// Number of completed searches.
    pub fn searches(&self) -> u64 {
        self.proof_count.load(Ordering::Relaxed)
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential_search(last_proof: u64, difficulty: usize) -> u64 {
        (0..).find(|&p| valid_proof(last_proof, p, difficulty)).unwrap()
    }

    #[test]
    fn test_difficulty_zero_accepts_everything() {
        assert!(valid_proof(100, 0, 0));
        assert!(valid_proof(0, u64::MAX, 0));
    }

    #[test]
    fn test_known_proofs_from_genesis_seed() {
        // SHA-256("10035293") = 0000c415...
        assert!(valid_proof(100, 35293, 4));
        assert!(!valid_proof(100, 35292, 4));
        assert!(valid_proof(100, 16, 1));
    }

    #[test]
    fn test_difficulty_above_digest_length_rejects() {
        assert!(!valid_proof(100, 35293, MAX_DIFFICULTY + 1));
    }

    #[test]
    fn test_search_matches_sequential_scan() {
        let engine = PowEngine::new(4).unwrap();
        assert_eq!(engine.search(100, 1).unwrap(), 16);
        assert_eq!(engine.search(100, 2).unwrap(), 226);
        assert_eq!(engine.search(7, 2).unwrap(), sequential_search(7, 2));
    }

    #[test]
    fn test_search_crosses_batch_boundaries() {
        let engine = PowEngine::new(2).unwrap();
        // 6016 > SEARCH_BATCH
        assert_eq!(engine.search(100, 3).unwrap(), 6016);
    }

    #[test]
    fn test_mining_cost_tracks_average() {
        let engine = PowEngine::new(1).unwrap();
        assert_eq!(engine.mining_cost(), None);

        engine.search(100, 1).unwrap();
        engine.search(100, 2).unwrap();
        assert_eq!(engine.searches(), 2);
        assert_eq!(engine.mining_cost(), Some((16.0 + 226.0) / 2.0));
    }

    #[test]
    fn test_cancelled_search_records_nothing() {
        let engine = PowEngine::new(1).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(
            engine.search_cancellable(100, 4, &cancel),
            Err(ConsensusError::MiningCancelled)
        );
        assert_eq!(engine.searches(), 0);
    }

    #[test]
    fn test_search_rejects_impossible_difficulty() {
        let engine = PowEngine::new(1).unwrap();
        assert!(matches!(
            engine.search(1, 65),
            Err(ConsensusError::DifficultyOutOfRange { difficulty: 65, .. })
        ));
    }

    #[test]
    fn test_work_for_proof_uses_ledger_tip_and_difficulty() {
        let engine = PowEngine::new(1).unwrap();
        let ledger = Ledger::new(100, 2);
        let proof = engine.work_for_proof(&ledger, &CancellationToken::new()).unwrap();
        assert_eq!(proof, 226);
    }
}
