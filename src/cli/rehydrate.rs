//! Rehydrate command for factdrill.
//!
//! Rebuilds a learner's ledger by replaying their attempt log, reports
//! whether it matches the stored ledger, and saves the rebuilt copy.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{Ledger, Tier};
use crate::error::{DrillError, Result};
use crate::history::{rehydrate, AttemptLog};
use crate::storage::{validate_learner_id, LedgerStore};

/// Options for the rehydrate command.
#[derive(Debug, Clone, Default)]
pub struct RehydrateOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Tier for log lines that predate per-attempt tiers (default: config).
    pub tier: Option<Tier>,
    /// Compare only; don't overwrite the stored ledger.
    pub dry_run: bool,
}

/// Output format for the rehydrate command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RehydrateOutput {
    pub success: bool,
    pub learner_id: String,
    pub attempts_replayed: usize,
    pub current_stage: u32,
    /// `None` when no ledger was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_stored: Option<bool>,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RehydrateOutput {
    /// Create a failed output.
    pub fn failure(learner_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.into(),
            attempts_replayed: 0,
            current_stage: 0,
            matched_stored: None,
            saved: false,
            error: Some(error.into()),
        }
    }
}

/// The rehydrate command implementation.
pub struct RehydrateCommand<S: LedgerStore> {
    store: S,
    config: Config,
    attempts_dir: PathBuf,
}

impl<S: LedgerStore> RehydrateCommand<S> {
    /// Create a new rehydrate command.
    pub fn new(store: S, config: Config, attempts_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            config,
            attempts_dir: attempts_dir.into(),
        }
    }

    /// Run the rehydrate command.
    pub fn run(&self, learner_id: &str, options: &RehydrateOptions) -> RehydrateOutput {
        match self.try_run(learner_id, options) {
            Ok(output) => output,
            Err(e) => RehydrateOutput::failure(learner_id, e.to_string()),
        }
    }

    fn try_run(&self, learner_id: &str, options: &RehydrateOptions) -> Result<RehydrateOutput> {
        validate_learner_id(learner_id)?;
        let fallback_tier = options.tier.unwrap_or(self.config.learner.default_tier);

        let log = AttemptLog::for_learner(&self.attempts_dir, learner_id);
        let attempts_replayed = log.count()?;
        if attempts_replayed == 0 {
            return Err(DrillError::learner_not_found(learner_id));
        }

        let stored = self.store.get(learner_id)?;

        // Keep the learner's own targets; only the learned state is rebuilt.
        let base = match &stored {
            Some(s) => Ledger::new(s.target_accuracy, s.daily_goal),
            None => self.config.fresh_ledger(),
        };
        let rebuilt = rehydrate(&log, &base, fallback_tier)?;
        let matched_stored = stored.as_ref().map(|s| *s == rebuilt);

        match matched_stored {
            Some(false) => tracing::warn!(
                "stored ledger for {} differs from its attempt log",
                learner_id
            ),
            Some(true) => tracing::debug!("stored ledger for {} matches its log", learner_id),
            None => tracing::info!("no stored ledger for {}, rebuilding", learner_id),
        }

        let saved = !options.dry_run && matched_stored != Some(true);
        if saved {
            self.store.put(learner_id, &rebuilt)?;
        }

        Ok(RehydrateOutput {
            success: true,
            learner_id: learner_id.to_string(),
            attempts_replayed,
            current_stage: rebuilt.current_stage,
            matched_stored,
            saved,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &RehydrateOutput, options: &RehydrateOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &RehydrateOutput) -> String {
        if !output.success {
            return format!(
                "Rehydrate failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let verdict = match output.matched_stored {
            Some(true) => "matches the stored ledger",
            Some(false) => "differs from the stored ledger",
            None => "no ledger was stored",
        };
        let action = if output.saved {
            "Rebuilt ledger saved."
        } else {
            "Stored ledger left unchanged."
        };

        format!(
            "Replayed {} attempts for {} (stage {}): {}.\n{}\n",
            output.attempts_replayed, output.learner_id, output.current_stage, verdict, action
        )
    }
}
