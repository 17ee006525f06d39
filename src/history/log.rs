//! Append-only attempt log.
//!
//! Each learner has one JSONL file (`<home>/attempts/<learner>.jsonl`) with
//! one attempt per line in the order the attempts were applied. The log is
//! the source of truth; the stored ledger can always be rebuilt from it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{update, Attempt, Ledger, Tier};
use crate::error::{DrillError, Result};

/// Schema version for log lines.
///
/// Increment when the line format changes in a breaking way.
/// Version 2 added `tier`; version 1 lines carry none.
pub const ATTEMPT_LOG_SCHEMA_VERSION: u8 = 2;

/// One line of the attempt log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedAttempt {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// When the line was written.
    pub ts: DateTime<Utc>,
    /// Tier the attempt was applied under. `None` on version 1 lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(flatten)]
    pub attempt: Attempt,
}

impl LoggedAttempt {
    /// Wrap an attempt applied under `tier`, stamped with the current time.
    pub fn new(attempt: Attempt, tier: Tier) -> Self {
        Self::with_timestamp(attempt, tier, Utc::now())
    }

    /// Wrap an attempt with a specific write time (for testing).
    pub fn with_timestamp(attempt: Attempt, tier: Tier, ts: DateTime<Utc>) -> Self {
        Self {
            v: ATTEMPT_LOG_SCHEMA_VERSION,
            ts,
            tier: Some(tier),
            attempt,
        }
    }
}

/// JSONL writer and reader for one learner's attempts.
#[derive(Debug, Clone)]
pub struct AttemptLog {
    path: PathBuf,
}

impl AttemptLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Log for `learner_id` inside `dir`.
    pub fn for_learner(dir: impl AsRef<Path>, learner_id: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{}.jsonl", learner_id)))
    }

    /// Append one line.
    pub fn append(&self, entry: &LoggedAttempt) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| DrillError::storage(parent, e))?;
        }

        let json = serde_json::to_string(entry)
            .map_err(|e| DrillError::serde(format!("Failed to serialize attempt: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| DrillError::storage(&self.path, e))?;

        writeln!(file, "{}", json).map_err(|e| DrillError::storage(&self.path, e))?;

        Ok(())
    }

    /// Append an attempt applied under `tier`, stamped with the current time.
    pub fn append_attempt(&self, attempt: &Attempt, tier: Tier) -> Result<()> {
        self.append(&LoggedAttempt::new(*attempt, tier))
    }

    /// Read every line. A missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<LoggedAttempt>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| DrillError::storage(&self.path, e))?;

        let mut entries = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let entry: LoggedAttempt = serde_json::from_str(line).map_err(|e| {
                DrillError::serde(format!(
                    "Failed to parse attempt on line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// The attempts alone, in log order.
    pub fn attempts(&self) -> Result<Vec<Attempt>> {
        Ok(self.read_all()?.into_iter().map(|e| e.attempt).collect())
    }

    /// Number of logged attempts.
    pub fn count(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| DrillError::storage(&self.path, e))?;

        Ok(content.lines().filter(|l| !l.trim().is_empty()).count())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Rebuild a ledger by replaying the whole log onto `base`.
///
/// `base` should be an empty ledger carrying the learner's policy constants.
/// Each line is applied under the tier it was logged with; `fallback_tier`
/// covers version 1 lines that predate the `tier` field.
pub fn rehydrate(log: &AttemptLog, base: &Ledger, fallback_tier: Tier) -> Result<Ledger> {
    let entries = log.read_all()?;
    let untiered = entries.iter().filter(|e| e.tier.is_none()).count();
    tracing::debug!(
        "rehydrating ledger from {} attempts in {}",
        entries.len(),
        log.path().display()
    );
    if untiered > 0 {
        tracing::warn!(
            "{} attempts in {} carry no tier, replaying them as {}",
            untiered,
            log.path().display(),
            fallback_tier
        );
    }

    let mut current = base.clone();
    for (index, entry) in entries.iter().enumerate() {
        let tier = entry.tier.unwrap_or(fallback_tier);
        current = update(&current, &entry.attempt, tier).map_err(|e| match e {
            DrillError::Validation { field, message } => DrillError::validation(
                field,
                format!("attempt #{}: {}", index + 1, message),
            ),
            other => other,
        })?;
    }
    Ok(current)
}
