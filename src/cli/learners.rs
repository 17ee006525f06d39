//! Learners command for factdrill.
//!
//! Lists stored learners, most recently practiced first.

use serde::{Deserialize, Serialize};

use crate::core::Ledger;
use crate::error::{FailOpen, Result};
use crate::storage::LedgerStore;

/// Default number of learners to list.
pub const DEFAULT_LIMIT: usize = 20;

/// Options for the learners command.
#[derive(Debug, Clone, Default)]
pub struct LearnersOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of learners.
    pub limit: Option<usize>,
}

/// Summary row for one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerInfo {
    pub learner_id: String,
    pub current_stage: u32,
    pub total_attempts: u64,
    pub mastered: u32,
}

impl LearnerInfo {
    fn from_ledger(learner_id: &str, ledger: &Ledger) -> Self {
        Self {
            learner_id: learner_id.to_string(),
            current_stage: ledger.current_stage,
            total_attempts: ledger.total_attempts(),
            mastered: ledger.summary().mastered,
        }
    }
}

/// Output format for the learners command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnersOutput {
    pub success: bool,
    pub count: usize,
    pub learners: Vec<LearnerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LearnersOutput {
    pub fn success(learners: Vec<LearnerInfo>) -> Self {
        Self {
            success: true,
            count: learners.len(),
            learners,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            learners: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The learners command implementation.
pub struct LearnersCommand<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> LearnersCommand<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the learners command.
    pub fn run(&self, options: &LearnersOptions) -> LearnersOutput {
        match self.try_run(options) {
            Ok(learners) => LearnersOutput::success(learners),
            Err(e) => LearnersOutput::failure(e.to_string()),
        }
    }

    fn try_run(&self, options: &LearnersOptions) -> Result<Vec<LearnerInfo>> {
        let ids = self.store.list(options.limit.unwrap_or(DEFAULT_LIMIT))?;

        // An unreadable ledger drops out of the listing rather than failing it.
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.store
                    .get(id)
                    .fail_open_default("loading ledger for listing")
                    .map(|ledger| LearnerInfo::from_ledger(id, &ledger))
            })
            .collect())
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &LearnersOutput, options: &LearnersOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &LearnersOutput) -> String {
        if !output.success {
            return format!(
                "Listing failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.learners.is_empty() {
            return "No learners yet.\n".to_string();
        }

        let mut out = format!("{} learner(s):\n\n", output.count);
        for l in &output.learners {
            out.push_str(&format!(
                "  {:<20} stage {:>2}  {:>5} attempts  {} mastered\n",
                l.learner_id, l.current_stage, l.total_attempts, l.mastered
            ));
        }
        out
    }
}
