//! Status command for factdrill.
//!
//! Shows a learner's stage, per-table stats, status summary, and progress
//! toward today's goal.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{StatusSummary, TableStat, TableStatus, Tier};
use crate::error::{DrillError, FailOpen, Result};
use crate::history::{AttemptLog, DailyProgress};
use crate::storage::{validate_learner_id, LedgerStore};

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Tier override (default: config `learner.default_tier`).
    pub tier: Option<Tier>,
    /// Day to report progress for (default: today, UTC).
    pub date: Option<NaiveDate>,
}

/// Per-table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub table: u32,
    pub status: TableStatus,
    pub accuracy: f64,
    pub avg_time: f64,
    pub total_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_practiced: Option<i64>,
}

impl TableInfo {
    fn from_stat(table: u32, stat: &TableStat) -> Self {
        Self {
            table,
            status: stat.status,
            accuracy: stat.accuracy,
            avg_time: stat.avg_time,
            total_attempts: stat.total_attempts,
            last_practiced: stat.last_practiced,
        }
    }
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusOutput {
    pub success: bool,
    pub learner_id: String,
    pub current_stage: u32,
    pub max_stage: u32,
    pub total_attempts: u64,
    pub summary: StatusSummary,
    pub tables: Vec<TableInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<DailyProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusOutput {
    /// Create a failed output.
    pub fn failure(learner_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            learner_id: learner_id.into(),
            current_stage: 0,
            max_stage: 0,
            total_attempts: 0,
            summary: StatusSummary::default(),
            tables: Vec::new(),
            daily: None,
            error: Some(error.into()),
        }
    }
}

/// The status command implementation.
pub struct StatusCommand<S: LedgerStore> {
    store: S,
    config: Config,
    attempts_dir: PathBuf,
}

impl<S: LedgerStore> StatusCommand<S> {
    /// Create a new status command.
    pub fn new(store: S, config: Config, attempts_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            config,
            attempts_dir: attempts_dir.into(),
        }
    }

    /// Run the status command.
    pub fn run(&self, learner_id: &str, options: &StatusOptions) -> StatusOutput {
        match self.try_run(learner_id, options) {
            Ok(output) => output,
            Err(e) => StatusOutput::failure(learner_id, e.to_string()),
        }
    }

    fn try_run(&self, learner_id: &str, options: &StatusOptions) -> Result<StatusOutput> {
        validate_learner_id(learner_id)?;
        let tier = options.tier.unwrap_or(self.config.learner.default_tier);
        let ledger = self
            .store
            .get(learner_id)?
            .ok_or_else(|| DrillError::learner_not_found(learner_id))?;

        // Progress is informational; a damaged log shouldn't hide the ledger.
        let attempts = AttemptLog::for_learner(&self.attempts_dir, learner_id)
            .attempts()
            .fail_open_default("reading attempt log");
        let date = options.date.unwrap_or_else(|| Utc::now().date_naive());
        let daily = DailyProgress::for_day(&attempts, date, ledger.daily_goal);

        Ok(StatusOutput {
            success: true,
            learner_id: learner_id.to_string(),
            current_stage: ledger.current_stage,
            max_stage: tier.max_stage(),
            total_attempts: ledger.total_attempts(),
            summary: ledger.summary(),
            tables: ledger
                .table_stats
                .iter()
                .map(|(table, stat)| TableInfo::from_stat(*table, stat))
                .collect(),
            daily: Some(daily),
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    fn format_human_readable(&self, output: &StatusOutput) -> String {
        if !output.success {
            return format!(
                "Status unavailable: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut out = String::new();
        out.push_str(&format!("Learner: {}\n", output.learner_id));
        out.push_str(&format!(
            "Stage: {} of {}\n",
            output.current_stage, output.max_stage
        ));
        out.push_str(&format!("Attempts: {}\n", output.total_attempts));
        if let Some(daily) = &output.daily {
            let marker = if daily.is_met() { " (goal met)" } else { "" };
            out.push_str(&format!(
                "Today: {}/{}{}\n",
                daily.done, daily.goal, marker
            ));
        }

        if !output.tables.is_empty() {
            out.push_str("\nTable  Status         Accuracy  Avg time  Attempts\n");
            for t in &output.tables {
                out.push_str(&format!(
                    "{:>5}  {:<13}  {:>7.1}%  {:>6.0}ms  {:>8}\n",
                    t.table,
                    t.status.display_name(),
                    t.accuracy,
                    t.avg_time,
                    t.total_attempts
                ));
            }
        }

        let s = &output.summary;
        out.push_str(&format!(
            "\nMastered: {}  Practicing: {}  Focus needed: {}\n",
            s.mastered, s.practicing, s.focus_needed
        ));
        out
    }
}
