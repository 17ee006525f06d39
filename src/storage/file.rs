//! File-based ledger storage for factdrill.
//!
//! Ledgers are stored as pretty-printed JSON files in `<home>/ledgers/`,
//! one per learner. Writes go to a temp file first and are renamed into
//! place so a crash never leaves a half-written ledger.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::config::ledgers_dir;
use crate::core::Ledger;
use crate::error::{DrillError, Result};
use crate::storage::traits::validate_learner_id;
use crate::storage::LedgerStore;

/// File-based ledger storage.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    /// Directory where ledger files are stored.
    ledgers_dir: PathBuf,
}

impl FileLedgerStore {
    /// Create a store in the default directory (`<home>/ledgers/`).
    pub fn new() -> Result<Self> {
        let dir = ledgers_dir().ok_or_else(|| {
            DrillError::config("Could not determine ledgers directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(ledgers_dir: impl Into<PathBuf>) -> Result<Self> {
        let ledgers_dir = ledgers_dir.into();

        if !ledgers_dir.exists() {
            fs::create_dir_all(&ledgers_dir).map_err(|e| DrillError::storage(&ledgers_dir, e))?;
        }

        Ok(Self { ledgers_dir })
    }

    fn ledger_path(&self, learner_id: &str) -> PathBuf {
        self.ledgers_dir.join(format!("{}.json", learner_id))
    }

    fn temp_path(&self, learner_id: &str) -> PathBuf {
        self.ledgers_dir.join(format!(".{}.json.tmp", learner_id))
    }

    fn atomic_write(&self, learner_id: &str, ledger: &Ledger) -> Result<()> {
        let final_path = self.ledger_path(learner_id);
        let temp_path = self.temp_path(learner_id);

        let json = serde_json::to_string_pretty(ledger)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| DrillError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| DrillError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| DrillError::storage(&temp_path, e))?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| DrillError::storage(&final_path, e))?;

        Ok(())
    }
}

impl LedgerStore for FileLedgerStore {
    fn get(&self, learner_id: &str) -> Result<Option<Ledger>> {
        validate_learner_id(learner_id)?;
        let path = self.ledger_path(learner_id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| DrillError::storage(&path, e))?;
        let ledger: Ledger = serde_json::from_str(&content)?;

        Ok(Some(ledger))
    }

    fn put(&self, learner_id: &str, ledger: &Ledger) -> Result<()> {
        validate_learner_id(learner_id)?;
        self.atomic_write(learner_id, ledger)
    }

    fn list(&self, limit: usize) -> Result<Vec<String>> {
        if !self.ledgers_dir.exists() {
            return Ok(Vec::new());
        }

        let mut learners: Vec<(String, SystemTime)> = Vec::new();

        let entries = fs::read_dir(&self.ledgers_dir)
            .map_err(|e| DrillError::storage(&self.ledgers_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| DrillError::storage(&self.ledgers_dir, e))?;
            let path = entry.path();

            // Skip non-JSON files and temp files
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if stem.starts_with('.') || validate_learner_id(&stem).is_err() {
                continue;
            }

            let mtime = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            learners.push((stem, mtime));
        }

        // Most recent first; ties broken by name so output is stable.
        learners.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(learners.into_iter().take(limit).map(|(id, _)| id).collect())
    }

    fn delete(&self, learner_id: &str) -> Result<()> {
        validate_learner_id(learner_id)?;
        let path = self.ledger_path(learner_id);

        if path.exists() {
            fs::remove_file(&path).map_err(|e| DrillError::storage(&path, e))?;
        }

        let temp_path = self.temp_path(learner_id);
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }

        Ok(())
    }
}
