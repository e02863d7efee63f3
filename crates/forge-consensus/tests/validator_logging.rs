// VALIDATOR DIAGNOSTICS
// Verbose validation reports every block pair and the rejection reason;
// silent validation writes nothing.

use forge_consensus::{CancellationToken, ChainValidator, PowEngine, Verbosity};
use forge_core::Ledger;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::{const_mutex, Mutex};
use std::sync::Once;
use std::thread::{self, ThreadId};

const VALIDATOR_TARGET: &str = "forge_consensus::chain_validator";

struct CapturingLogger {
    records: Mutex<Vec<(ThreadId, Level, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target() == VALIDATOR_TARGET
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.records
                .lock()
                .push((thread::current().id(), record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    records: const_mutex(Vec::new()),
};
static INIT: Once = Once::new();

/// Run `f` and return the validator records it produced on this thread.
fn captured<F: FnOnce()>(f: F) -> Vec<(Level, String)> {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    let me = thread::current().id();
    LOGGER.records.lock().retain(|(id, _, _)| *id != me);
    f();
    LOGGER
        .records
        .lock()
        .iter()
        .filter(|(id, _, _)| *id == me)
        .map(|(_, level, message)| (*level, message.clone()))
        .collect()
}

fn mined_ledger(blocks: usize) -> Ledger {
    let engine = PowEngine::new(1).unwrap();
    let mut ledger = Ledger::new(100, 1);
    for _ in 0..blocks {
        let proof = engine
            .work_for_proof(&ledger, &CancellationToken::new())
            .unwrap();
        ledger.new_block(proof, None);
    }
    ledger
}

#[test]
fn test_silent_mode_emits_nothing() {
    let mut ledger = mined_ledger(2);
    let records = captured(|| {
        assert!(ChainValidator::is_valid(ledger.chain(), 1, Verbosity::Silent));
    });
    assert!(records.is_empty());

    if let Some(block) = ledger.block_mut(1) {
        block.proof += 1;
    }
    let records = captured(|| {
        assert!(!ChainValidator::is_valid(ledger.chain(), 1, Verbosity::Silent));
    });
    assert!(records.is_empty());
}

#[test]
fn test_verbose_mode_reports_pairs() {
    let ledger = mined_ledger(2);
    let records = captured(|| {
        assert!(ChainValidator::is_valid(ledger.chain(), 1, Verbosity::Verbose));
    });
    // Two pairs, three lines each.
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|(level, _)| *level == Level::Info));
    assert_eq!(records[2].1, "-----------");
}

#[test]
fn test_verbose_rejection_is_warned() {
    let mut ledger = mined_ledger(2);
    if let Some(block) = ledger.block_mut(2) {
        block.previous_hash = "forged".into();
    }
    let records = captured(|| {
        assert!(!ChainValidator::is_valid(ledger.chain(), 1, Verbosity::Verbose));
    });
    let warnings: Vec<_> = records
        .iter()
        .filter(|(level, _)| *level == Level::Warn)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].1.contains("Chain rejected"));
}
