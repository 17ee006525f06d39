//! The per-learner ledger.
//!
//! Plain data: the stage being taught, per-table aggregates, and per-fact
//! streaks. All behavior lives in the updater, weighter, and composer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::fact::FactKey;
use crate::core::tier::DEFAULT_STAGE;

/// Default accuracy target shown to learners.
pub const DEFAULT_TARGET_ACCURACY: f64 = 90.0;

/// Default number of attempts per day.
pub const DEFAULT_DAILY_GOAL: u32 = 20;

/// Mastery classification of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    #[default]
    NotStarted,
    Practicing,
    FocusNeeded,
    Mastered,
}

impl TableStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            TableStatus::NotStarted => "not started",
            TableStatus::Practicing => "practicing",
            TableStatus::FocusNeeded => "focus needed",
            TableStatus::Mastered => "mastered",
        }
    }
}

/// Aggregate performance on one table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TableStat {
    pub status: TableStatus,
    /// Exponential moving average of correctness, 0 to 100.
    pub accuracy: f64,
    /// Exponential moving average of response time in milliseconds.
    pub avg_time: f64,
    pub total_attempts: u32,
    /// Epoch milliseconds of the latest attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_practiced: Option<i64>,
}

/// Consecutive fast-correct answers on one fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FactStreak {
    pub streak: u32,
    /// Epoch milliseconds of the latest attempt; 0 if never attempted.
    pub last_attempt: i64,
}

impl FactStreak {
    /// Whether this fact has ever been attempted.
    pub fn was_attempted(&self) -> bool {
        self.last_attempt > 0
    }
}

/// Complete scheduling state for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// The table currently being taught.
    pub current_stage: u32,
    #[serde(default)]
    pub table_stats: BTreeMap<u32, TableStat>,
    #[serde(default)]
    pub fact_streaks: BTreeMap<FactKey, FactStreak>,
    pub target_accuracy: f64,
    pub daily_goal: u32,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            current_stage: DEFAULT_STAGE,
            table_stats: BTreeMap::new(),
            fact_streaks: BTreeMap::new(),
            target_accuracy: DEFAULT_TARGET_ACCURACY,
            daily_goal: DEFAULT_DAILY_GOAL,
        }
    }
}

impl Ledger {
    /// Create an empty ledger with custom policy constants.
    pub fn new(target_accuracy: f64, daily_goal: u32) -> Self {
        Self {
            target_accuracy,
            daily_goal,
            ..Self::default()
        }
    }

    /// Stats for a table, or the not-started default.
    pub fn table_stat(&self, table: u32) -> TableStat {
        self.table_stats.get(&table).copied().unwrap_or_default()
    }

    /// Streak record for a fact, or the never-attempted default.
    pub fn streak_for(&self, fact: FactKey) -> FactStreak {
        self.fact_streaks.get(&fact).copied().unwrap_or_default()
    }

    /// Total attempts across every table.
    pub fn total_attempts(&self) -> u64 {
        self.table_stats
            .values()
            .map(|s| s.total_attempts as u64)
            .sum()
    }

    /// True when no table has been practiced yet.
    pub fn is_fresh(&self) -> bool {
        !self.table_stats.values().any(|s| s.total_attempts > 0)
    }

    /// Mastered tables strictly below the current stage, ascending.
    pub fn mastered_below_stage(&self) -> Vec<u32> {
        self.table_stats
            .iter()
            .filter(|(table, stat)| {
                **table < self.current_stage && stat.status == TableStatus::Mastered
            })
            .map(|(table, _)| *table)
            .collect()
    }

    /// Count tables by status.
    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for stat in self.table_stats.values() {
            match stat.status {
                TableStatus::NotStarted => summary.not_started += 1,
                TableStatus::Practicing => summary.practicing += 1,
                TableStatus::FocusNeeded => summary.focus_needed += 1,
                TableStatus::Mastered => summary.mastered += 1,
            }
        }
        summary
    }
}

/// Number of tables in each status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusSummary {
    pub not_started: u32,
    pub practicing: u32,
    pub focus_needed: u32,
    pub mastered: u32,
}
