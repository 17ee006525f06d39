//! Answer command for factdrill.
//!
//! Grades one response, applies it to the learner's ledger, appends it to
//! the attempt log, and saves the updated ledger.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{update, FactKey, QuestionCandidate, QuestionKind, Tier};
use crate::error::Result;
use crate::history::AttemptLog;
use crate::storage::{validate_learner_id, LedgerStore};

/// Options for the answer command.
#[derive(Debug, Clone, Default)]
pub struct AnswerOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Tier override (default: config `learner.default_tier`).
    pub tier: Option<Tier>,
    /// The question was asked as `t × ? = product`.
    pub missing_factor: bool,
    /// Time the learner took to answer.
    pub time_ms: i64,
    /// Attempt time in epoch ms (default: now).
    pub timestamp: Option<i64>,
}

/// Output format for the answer command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutput {
    pub success: bool,
    pub learner_id: String,
    pub prompt: String,
    pub expected: u32,
    pub response: u32,
    pub is_correct: bool,
    pub stage_before: u32,
    pub stage_after: u32,
    /// Status of the answered table after the update.
    pub table_status: String,
    pub table_accuracy: f64,
    pub streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerOutput {
    /// Create a failed output.
    pub fn failure(learner_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.into(),
            prompt: String::new(),
            expected: 0,
            response: 0,
            is_correct: false,
            stage_before: 0,
            stage_after: 0,
            table_status: String::new(),
            table_accuracy: 0.0,
            streak: 0,
            error: Some(error.into()),
        }
    }
}

/// The answer command implementation.
pub struct AnswerCommand<S: LedgerStore> {
    store: S,
    config: Config,
    attempts_dir: PathBuf,
}

impl<S: LedgerStore> AnswerCommand<S> {
    /// Create a new answer command.
    pub fn new(store: S, config: Config, attempts_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            config,
            attempts_dir: attempts_dir.into(),
        }
    }

    /// Run the answer command.
    pub fn run(
        &self,
        learner_id: &str,
        table: u32,
        multiplier: u32,
        response: u32,
        options: &AnswerOptions,
    ) -> AnswerOutput {
        match self.try_run(learner_id, table, multiplier, response, options) {
            Ok(output) => output,
            Err(e) => AnswerOutput::failure(learner_id, e.to_string()),
        }
    }

    fn try_run(
        &self,
        learner_id: &str,
        table: u32,
        multiplier: u32,
        response: u32,
        options: &AnswerOptions,
    ) -> Result<AnswerOutput> {
        validate_learner_id(learner_id)?;
        let tier = options.tier.unwrap_or(self.config.learner.default_tier);
        let kind = if options.missing_factor {
            QuestionKind::MissingFactor
        } else {
            QuestionKind::Direct
        };

        let fact = FactKey::new(table, multiplier);
        fact.validate()?;
        let question = QuestionCandidate::new(fact, 0.0, kind);
        let timestamp = options
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let attempt = question.to_attempt(response, options.time_ms, timestamp);

        let ledger = self.store.get_or(learner_id, self.config.fresh_ledger())?;
        let updated = update(&ledger, &attempt, tier)?;

        // The log is written before the ledger so a lost save can be rehydrated.
        AttemptLog::for_learner(&self.attempts_dir, learner_id).append_attempt(&attempt, tier)?;
        self.store.put(learner_id, &updated)?;

        let stat = updated.table_stat(table);
        Ok(AnswerOutput {
            success: true,
            learner_id: learner_id.to_string(),
            prompt: question.prompt(),
            expected: question.expected_answer(),
            response,
            is_correct: attempt.is_correct,
            stage_before: ledger.current_stage,
            stage_after: updated.current_stage,
            table_status: stat.status.display_name().to_string(),
            table_accuracy: stat.accuracy,
            streak: updated.streak_for(attempt.fact()).streak,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &AnswerOutput, options: &AnswerOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &AnswerOutput) -> String {
        if !output.success {
            return format!(
                "Answer not recorded: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = String::new();
        if output.is_correct {
            out.push_str(&format!("{}  {} ✓\n", output.prompt, output.response));
        } else {
            out.push_str(&format!(
                "{}  {} ✗ (expected {})\n",
                output.prompt, output.response, output.expected
            ));
        }
        out.push_str(&format!(
            "Table: {} ({:.1}% accuracy), streak {}\n",
            output.table_status, output.table_accuracy, output.streak
        ));
        if output.stage_after != output.stage_before {
            out.push_str(&format!(
                "Stage {} → {}\n",
                output.stage_before, output.stage_after
            ));
        }
        out
    }
}
