//! In-memory ledger storage.
//!
//! Thread-safe store backed by `RwLock<HashMap>`, used by tests and by
//! embedders that persist ledgers themselves.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::Ledger;
use crate::error::Result;
use crate::storage::LedgerStore;

#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    /// Ledgers with a write sequence number for recency ordering.
    ledgers: RwLock<HashMap<String, (u64, Ledger)>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ledgers.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.read().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.ledgers.write().unwrap().clear();
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn get(&self, learner_id: &str) -> Result<Option<Ledger>> {
        let ledgers = self.ledgers.read().unwrap();
        Ok(ledgers.get(learner_id).map(|(_, l)| l.clone()))
    }

    fn put(&self, learner_id: &str, ledger: &Ledger) -> Result<()> {
        let mut ledgers = self.ledgers.write().unwrap();
        let seq = ledgers.values().map(|(s, _)| *s).max().map_or(0, |s| s + 1);
        ledgers.insert(learner_id.to_string(), (seq, ledger.clone()));
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<String>> {
        let ledgers = self.ledgers.read().unwrap();
        let mut ids: Vec<(&String, u64)> = ledgers.iter().map(|(id, (s, _))| (id, *s)).collect();
        ids.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(ids.into_iter().take(limit).map(|(id, _)| id.clone()).collect())
    }

    fn delete(&self, learner_id: &str) -> Result<()> {
        self.ledgers.write().unwrap().remove(learner_id);
        Ok(())
    }
}
