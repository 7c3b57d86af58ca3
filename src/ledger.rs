use log::{info, warn};

use crate::blockchain::{Block, Blockchain, Payload, SealLimits};
use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::exam::ExamContract;
use crate::storage::LedgerStore;

/// A chain together with the file it is persisted to.
///
/// Owned by the caller for the lifetime of the process; every mutation goes
/// through [`Ledger::record`].
#[derive(Debug)]
pub struct Ledger {
    chain: Blockchain,
    store: LedgerStore,
    limits: SealLimits,
}

impl Ledger {
    /// Restore the ledger named by `config`, or start a fresh one.
    pub fn open(config: &Config) -> Result<Self> {
        let store = LedgerStore::new(&config.ledger_path);
        let chain = Blockchain::open(&store, config.difficulty)?;
        Ok(Self {
            chain,
            store,
            limits: config.seal_limits(),
        })
    }

    pub fn from_parts(chain: Blockchain, store: LedgerStore) -> Self {
        Self {
            chain,
            store,
            limits: SealLimits::unbounded(),
        }
    }

    pub fn with_seal_limits(mut self, limits: SealLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn chain(&self) -> &Blockchain {
        &self.chain
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Append `payload`, validate the chain and write it to disk.
    ///
    /// `Ok` means the ledger file now holds the new block.
    /// `Err(LedgerError::Integrity(_))` means the chain in memory failed
    /// validation and nothing was written. `Err(LedgerError::Persist { .. })`
    /// means the chain is valid but the write failed and can be retried
    /// with [`Ledger::persist`].
    pub fn record(&mut self, payload: Payload) -> Result<&Block> {
        let candidate = self.chain.candidate(payload)?;
        self.chain.append_with(candidate, &self.limits)?;

        if let Err(violation) = self.chain.check_links() {
            warn!("LEDGER - chain failed validation: {violation}");
            return Err(LedgerError::Integrity(violation));
        }

        self.persist()?;
        let tail = self.chain.latest().ok_or(LedgerError::EmptyChain)?;
        info!(
            "LEDGER - block #{} committed to {}",
            tail.index,
            self.store.path().display()
        );
        Ok(tail)
    }

    /// Check `glucose` against `contract` and record it.
    ///
    /// A rejected reading returns `Err(LedgerError::InvalidReading(_))`
    /// before any block is built, so the chain and the file are untouched.
    pub fn record_reading(&mut self, contract: &ExamContract, glucose: f64) -> Result<&Block> {
        let reading = contract.validate(glucose)?;
        self.record(Payload::Exam(reading))
    }

    /// Write the current chain to disk.
    pub fn persist(&self) -> Result<()> {
        self.store.save(self.chain.blocks())
    }
}

#[cfg(test)]
mod tests {
    use super::Ledger;
    use crate::blockchain::{Blockchain, Payload, SealLimits};
    use crate::config::Config;
    use crate::error::LedgerError;
    use crate::exam::ExamContract;
    use crate::storage::LedgerStore;

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            ledger_path: dir.join("blockchain.json"),
            ..Config::default()
        }
    }

    #[test]
    fn record_persists_and_reopens() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());

        let mut ledger = Ledger::open(&config).unwrap();
        let reading = ExamContract::default().validate(95.0).unwrap();
        let block = ledger.record(Payload::Exam(reading)).unwrap();
        assert_eq!(block.index, 1);
        assert!(block.digest.starts_with("00"));

        let reopened = Ledger::open(&config).unwrap();
        assert_eq!(reopened.chain().blocks(), ledger.chain().blocks());
        assert!(reopened.chain().validate());
    }

    #[test]
    fn rejected_reading_is_not_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::open(&config_in(tmp.path())).unwrap();
        let contract = ExamContract::default();

        for glucose in [250.0, 69.9, f64::NAN] {
            let err = ledger.record_reading(&contract, glucose).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidReading(_)));
        }
        assert_eq!(ledger.chain().len(), 1);
        assert!(!ledger.store().path().exists());

        let block = ledger.record_reading(&contract, 120.0).unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.payload.as_exam().map(|r| r.glucose()), Some(120.0));
        assert!(ledger.store().path().exists());
    }

    #[test]
    fn corrupted_chain_is_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(tmp.path().join("blockchain.json"));

        let mut chain = Blockchain::new(1).unwrap();
        let first = chain
            .candidate(Payload::Exam(ExamContract::default().validate(90.0).unwrap()))
            .unwrap();
        chain.append(first).unwrap();
        let mut blocks = chain.blocks().to_vec();
        blocks[1].payload = Payload::Note("tampered".into());

        let mut ledger = Ledger::from_parts(Blockchain::from_blocks(blocks, 1), store);
        let reading = ExamContract::default().validate(100.0).unwrap();
        let err = ledger.record(Payload::Exam(reading)).unwrap_err();
        assert!(matches!(err, LedgerError::Integrity(_)));
        assert!(!ledger.store().path().exists());
    }

    #[test]
    fn write_failure_is_surfaced() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(tmp.path().join("missing").join("blockchain.json"));
        let mut ledger = Ledger::from_parts(Blockchain::new(1).unwrap(), store);
        let reading = ExamContract::default().validate(100.0).unwrap();
        let err = ledger.record(Payload::Exam(reading)).unwrap_err();
        assert!(matches!(err, LedgerError::Persist { .. }));
        assert!(ledger.chain().validate());
    }

    #[test]
    fn seal_limits_apply() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(tmp.path().join("blockchain.json"));
        let mut ledger = Ledger::from_parts(Blockchain::new(64).unwrap(), store)
            .with_seal_limits(SealLimits::unbounded().with_max_attempts(3));
        let reading = ExamContract::default().validate(100.0).unwrap();
        let err = ledger.record(Payload::Exam(reading)).unwrap_err();
        assert!(matches!(err, LedgerError::SealAborted { attempts: 3, .. }));
        assert_eq!(ledger.chain().len(), 1);
    }
}
