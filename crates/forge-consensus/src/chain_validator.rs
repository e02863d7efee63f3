// CHAIN VALIDATOR
// Structural and proof-of-work integrity of an arbitrary candidate chain.
//
// Only ADJACENT pairs are checked: block[i].previous_hash must equal
// Hash(block[i-1]) and the proof pair must satisfy `valid_proof`. The
// transaction list of the tip is covered by nothing, so tampering inside
// the last sealed block goes undetected. That weakness is known and kept.

use crate::pow_engine::valid_proof;
use forge_core::{Block, Ledger};
use log::{info, warn};
use thiserror::Error;

/// Whether validation emits per-pair diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// No output; used on the consensus hot path
    Silent,
    /// Log each examined pair and the first violation
    Verbose,
}

/// First violation found while walking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    #[error("Block {index}: previous_hash {found} does not match {expected}")]
    BrokenLink {
        index: u64,
        expected: String,
        found: String,
    },

    #[error("Block {index}: proof {proof} does not satisfy difficulty after {last_proof}")]
    InvalidProof {
        index: u64,
        last_proof: u64,
        proof: u64,
    },
}

pub struct ChainValidator;

impl ChainValidator {
    /// Walk adjacent pairs and stop at the first violation.
    /// Empty and single-block chains are valid.
    pub fn validate(
        chain: &[Block],
        difficulty: usize,
        verbosity: Verbosity,
    ) -> Result<(), ChainViolation> {
        for pair in chain.windows(2) {
            let (last_block, block) = (&pair[0], &pair[1]);
            if verbosity == Verbosity::Verbose {
                info!("{:?}", last_block);
                info!("{:?}", block);
                info!("-----------");
            }

            let expected = Ledger::hash(last_block);
            if block.previous_hash != expected {
                return Err(ChainViolation::BrokenLink {
                    index: block.index,
                    expected,
                    found: block.previous_hash.clone(),
                });
            }

            if !valid_proof(last_block.proof, block.proof, difficulty) {
                return Err(ChainViolation::InvalidProof {
                    index: block.index,
                    last_proof: last_block.proof,
                    proof: block.proof,
                });
            }
        }
        Ok(())
    }

    pub fn is_valid(chain: &[Block], difficulty: usize, verbosity: Verbosity) -> bool {
        match Self::validate(chain, difficulty, verbosity) {
            Ok(()) => true,
            Err(violation) => {
                if verbosity == Verbosity::Verbose {
                    warn!("Chain rejected: {}", violation);
                }
                false
            }
        }
    }
}

/// Split ledgers into those whose length equals the longest VALID chain
/// and everything else.
///
/// The split is by length alone: an invalid ledger that happens to match
/// the winning length lands in the first group. With no valid ledger at
/// all, everything lands in the second.
pub fn partition_longest_valid(ledgers: Vec<Ledger>) -> (Vec<Ledger>, Vec<Ledger>) {
    let max_len = ledgers
        .iter()
        .filter(|l| ChainValidator::is_valid(l.chain(), l.difficulty(), Verbosity::Silent))
        .map(Ledger::len)
        .max()
        .unwrap_or(0);

    ledgers.into_iter().partition(|l| l.len() == max_len)
}
