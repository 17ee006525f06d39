//! Daily goal tracking.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::Attempt;

/// Attempts made on one UTC day against the learner's daily goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub done: u32,
    pub goal: u32,
}

impl DailyProgress {
    /// Count the attempts whose timestamp falls on `date` (UTC).
    pub fn for_day(attempts: &[Attempt], date: NaiveDate, goal: u32) -> Self {
        let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let end = start + Duration::days(1);
        let done = count_between(
            attempts,
            start.timestamp_millis(),
            end.timestamp_millis(),
        );
        Self { date, done, goal }
    }

    pub fn is_met(&self) -> bool {
        self.done >= self.goal
    }

    /// Attempts still needed today; 0 once the goal is met.
    pub fn remaining(&self) -> u32 {
        self.goal.saturating_sub(self.done)
    }
}

/// Attempts with `start_ms <= timestamp < end_ms`.
pub fn count_between(attempts: &[Attempt], start_ms: i64, end_ms: i64) -> u32 {
    attempts
        .iter()
        .filter(|a| a.timestamp >= start_ms && a.timestamp < end_ms)
        .count() as u32
}
