//! Ledger storage traits for factdrill.
//!
//! This module defines the `LedgerStore` trait. The scheduling core never
//! touches storage; callers load a ledger, run it through the updater, and
//! put the result back. Stores hold one ledger per learner and are expected
//! to be used single-writer per learner.

use std::sync::Arc;

use crate::core::Ledger;
use crate::error::{DrillError, Result};

/// Trait for ledger storage backends.
pub trait LedgerStore: Send + Sync {
    /// Retrieve a learner's ledger.
    ///
    /// Returns `Ok(None)` if the learner has no ledger yet.
    fn get(&self, learner_id: &str) -> Result<Option<Ledger>>;

    /// Save a learner's ledger, replacing any previous one.
    fn put(&self, learner_id: &str, ledger: &Ledger) -> Result<()>;

    /// List learner IDs, most recently saved first, up to `limit`.
    fn list(&self, limit: usize) -> Result<Vec<String>>;

    /// Delete a learner's ledger.
    ///
    /// Returns `Ok(())` even if the learner doesn't exist.
    fn delete(&self, learner_id: &str) -> Result<()>;

    /// Check if a learner has a ledger.
    fn exists(&self, learner_id: &str) -> Result<bool> {
        Ok(self.get(learner_id)?.is_some())
    }

    /// Load a learner's ledger, or `fresh` if none is stored.
    fn get_or(&self, learner_id: &str, fresh: Ledger) -> Result<Ledger> {
        Ok(self.get(learner_id)?.unwrap_or(fresh))
    }
}

/// Blanket implementation of LedgerStore for Arc-wrapped stores.
impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    fn get(&self, learner_id: &str) -> Result<Option<Ledger>> {
        (**self).get(learner_id)
    }

    fn put(&self, learner_id: &str, ledger: &Ledger) -> Result<()> {
        (**self).put(learner_id, ledger)
    }

    fn list(&self, limit: usize) -> Result<Vec<String>> {
        (**self).list(limit)
    }

    fn delete(&self, learner_id: &str) -> Result<()> {
        (**self).delete(learner_id)
    }
}

/// Learner IDs become file names, so only `[A-Za-z0-9_-]` is accepted.
pub fn validate_learner_id(learner_id: &str) -> Result<()> {
    if learner_id.is_empty() || learner_id.len() > 64 {
        return Err(DrillError::validation(
            "learner_id",
            "must be between 1 and 64 characters",
        ));
    }
    if !learner_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(DrillError::validation(
            "learner_id",
            format!(
                "'{}' may only contain letters, digits, '-' and '_'",
                learner_id
            ),
        ));
    }
    Ok(())
}
