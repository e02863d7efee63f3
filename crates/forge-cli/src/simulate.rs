// ENTITY SIMULATION
// A mining race between entities of uneven speed, followed by a transfer
// and a forgery attempt, all on in-memory forks of one genesis ledger.

use anyhow::{Context, Result};
use forge_consensus::{partition_longest_valid, PowEngine};
use forge_core::Ledger;
use forge_wallet_core::{Entity, WalletError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub entities: usize,
    pub rounds: usize,
    pub difficulty: usize,
    pub genesis_proof: u64,
    /// Entity `i` mines with speed `1 + i * speed_step`
    pub speed_step: f64,
    pub workers: usize,
    pub seed: u64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            entities: 3,
            rounds: 8,
            difficulty: 3,
            genesis_proof: 100,
            speed_step: 1.0,
            workers: 0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub chain_length: usize,
    /// One line per round: which entities produced a block
    pub rounds: Vec<Vec<String>>,
    pub transfer: Result<u64, String>,
    pub verdicts: Vec<String>,
    pub fake_verdicts: Vec<String>,
    pub balances: BTreeMap<String, i128>,
    pub mining_cost: Option<f64>,
}

fn adopt_longest(views: &[Ledger]) -> Option<Ledger> {
    let (winners, _) = partition_longest_valid(views.to_vec());
    winners.into_iter().next()
}

pub fn run_simulation(params: &SimulationParams) -> Result<SimulationReport> {
    anyhow::ensure!(params.entities >= 2, "a simulation needs at least two entities");

    let pow = Arc::new(PowEngine::new(params.workers).context("starting proof-of-work pool")?);
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut entities: Vec<Entity> = (0..params.entities)
        .map(|i| Entity::new(format!("entity-{}", i), pow.clone()))
        .collect();

    let mut canonical = Ledger::new(params.genesis_proof, params.difficulty);
    let mut rounds = Vec::with_capacity(params.rounds);

    for round in 0..params.rounds {
        let mut views = vec![canonical.clone()];
        let mut producers = Vec::new();
        for (i, entity) in entities.iter_mut().enumerate() {
            let speed = 1.0 + i as f64 * params.speed_step;
            if let Some(fork) = entity.mine_with_rng(&canonical, Some(speed), &mut rng)? {
                producers.push(entity.name().to_string());
                views.push(fork);
            }
        }
        info!("Round {}: {} block(s) produced", round + 1, producers.len());
        if let Some(longest) = adopt_longest(&views) {
            canonical = longest;
        }
        rounds.push(producers);
    }

    let (payer, rest) = entities.split_at_mut(1);
    let transfer = match payer[0].gives(&canonical, &mut rest[0], 1) {
        Ok(fork) => {
            canonical = fork;
            Ok(1)
        }
        Err(e @ WalletError::InsufficientFunds { .. }) => {
            warn!("Transfer rejected: {}", e);
            Err(e.to_string())
        }
        Err(e) => return Err(e.into()),
    };

    let verdicts = entities.iter().map(|e| e.validate_blockchain(&canonical)).collect();

    let forger = entities.len() - 1;
    let faked = entities[forger].some_fake(&canonical)?;
    let fake_verdicts = entities.iter().map(|e| e.validate_blockchain(&faked)).collect();

    let balances = entities
        .iter()
        .map(|e| (e.name().to_string(), e.balance(&canonical).total))
        .collect();

    Ok(SimulationReport {
        chain_length: canonical.len(),
        rounds,
        transfer,
        verdicts,
        fake_verdicts,
        balances,
        mining_cost: pow.mining_cost(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> SimulationParams {
        SimulationParams {
            difficulty: 1,
            rounds: 4,
            workers: 1,
            ..SimulationParams::default()
        }
    }

    #[test]
    fn test_simulation_grows_and_validates() {
        let report = run_simulation(&quick()).unwrap();
        let produced_rounds = report.rounds.iter().filter(|r| !r.is_empty()).count();
        // Entity 0 mines at speed 1 and never skips.
        assert_eq!(produced_rounds, 4);
        assert!(report.chain_length >= 5);
        assert!(report.verdicts.iter().all(|v| v.ends_with("accepts the blockchain")));
        assert!(report.mining_cost.is_some());
    }

    #[test]
    fn test_supply_is_conserved() {
        let report = run_simulation(&quick()).unwrap();
        let total: i128 = report.balances.values().sum();
        // One reward per adopted mining round.
        assert_eq!(total, 4);
        assert!(report.transfer.is_ok());
    }

    #[test]
    fn test_needs_two_entities() {
        let params = SimulationParams {
            entities: 1,
            ..quick()
        };
        assert!(run_simulation(&params).is_err());
    }
}
