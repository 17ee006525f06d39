//! Learner tier policy.
//!
//! The tier is decided outside the scheduler (usually from grade level) and
//! passed into every operation. It controls the stage ceiling, which
//! multipliers are drilled, the default session size, and whether a fresh
//! learner gets the fair-start placement.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DrillError;

/// Stage every new ledger starts on.
pub const DEFAULT_STAGE: u32 = 2;

/// Stage a brand-new advanced learner is placed on.
pub const FAIR_START_STAGE: u32 = 11;

/// Learner policy bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Younger learners: tables up to 12, every multiplier 1 to 10.
    #[default]
    Basic,
    /// Older learners: tables up to 20, trivial multipliers skipped.
    Advanced,
}

impl Tier {
    /// Highest stage a learner on this tier can reach.
    pub fn max_stage(&self) -> u32 {
        match self {
            Tier::Basic => 12,
            Tier::Advanced => 20,
        }
    }

    /// Default number of questions in a session.
    pub fn session_length(&self) -> usize {
        match self {
            Tier::Basic => 20,
            Tier::Advanced => 25,
        }
    }

    /// Whether fresh learners on this tier skip the trivial early tables.
    pub fn has_fair_start(&self) -> bool {
        matches!(self, Tier::Advanced)
    }

    /// Whether a multiplier is too trivial to drill on this tier.
    pub fn excludes(&self, multiplier: u32) -> bool {
        match self {
            Tier::Basic => false,
            Tier::Advanced => multiplier == 1 || multiplier == 10,
        }
    }

    /// Multipliers drilled for tables while the learner sits on `stage`.
    ///
    /// Basic always drills 1 to 10. Advanced drills 2 up to the larger of 9
    /// and the stage, leaving out 10.
    pub fn allowed_multipliers(&self, stage: u32) -> Vec<u32> {
        match self {
            Tier::Basic => (1..=10).collect(),
            Tier::Advanced => (2..=stage.max(9))
                .filter(|m| !self.excludes(*m))
                .collect(),
        }
    }

    /// Lowercase name, as used in config files and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(Tier::Basic),
            "advanced" => Ok(Tier::Advanced),
            other => Err(DrillError::config(format!(
                "unknown tier '{}', expected 'basic' or 'advanced'",
                other
            ))),
        }
    }
}
