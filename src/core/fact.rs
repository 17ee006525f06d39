//! Facts, attempts, and question candidates.
//!
//! A fact is one multiplication pair. Attempts are the immutable input
//! events produced by the UI; question candidates are what the session
//! composer hands back for the UI to render.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DrillError, Result};

/// Largest accepted table or multiplier.
///
/// Matches the highest advanced stage; it also keeps every product well
/// inside `u32`.
pub const MAX_FACTOR: u32 = 20;

/// Identifies a drillable fact: `table × multiplier`.
///
/// Serialized as `"{table}x{multiplier}"` so it can key a JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FactKey {
    pub table: u32,
    pub multiplier: u32,
}

impl FactKey {
    pub fn new(table: u32, multiplier: u32) -> Self {
        Self { table, multiplier }
    }

    /// The product `table × multiplier`.
    ///
    /// Callers grading a response validate the key first; see [`FactKey::validate`].
    pub fn product(&self) -> u32 {
        self.table * self.multiplier
    }

    /// Reject factors outside `1..=MAX_FACTOR`.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("table", self.table), ("multiplier", self.multiplier)] {
            if value == 0 {
                return Err(DrillError::validation(
                    field,
                    "must be a positive integer, got 0",
                ));
            }
            if value > MAX_FACTOR {
                return Err(DrillError::validation(
                    field,
                    format!("must be at most {}, got {}", MAX_FACTOR, value),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.table, self.multiplier)
    }
}

impl From<FactKey> for String {
    fn from(key: FactKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for FactKey {
    type Error = DrillError;

    fn try_from(value: String) -> Result<Self> {
        let (table, multiplier) = value
            .split_once('x')
            .ok_or_else(|| DrillError::serde(format!("malformed fact key '{}'", value)))?;
        let table = table
            .parse::<u32>()
            .map_err(|e| DrillError::serde(format!("malformed fact key '{}': {}", value, e)))?;
        let multiplier = multiplier
            .parse::<u32>()
            .map_err(|e| DrillError::serde(format!("malformed fact key '{}': {}", value, e)))?;
        Ok(Self::new(table, multiplier))
    }
}

/// One learner interaction with one fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub table: u32,
    pub multiplier: u32,
    pub is_correct: bool,
    /// Response time in milliseconds.
    pub time_taken_ms: i64,
    /// When the attempt happened, epoch milliseconds.
    pub timestamp: i64,
}

impl Attempt {
    pub fn new(
        table: u32,
        multiplier: u32,
        is_correct: bool,
        time_taken_ms: i64,
        timestamp: i64,
    ) -> Self {
        Self {
            table,
            multiplier,
            is_correct,
            time_taken_ms,
            timestamp,
        }
    }

    /// The fact this attempt was on.
    pub fn fact(&self) -> FactKey {
        FactKey::new(self.table, self.multiplier)
    }

    /// Reject attempts the ledger updater must not apply.
    pub fn validate(&self) -> Result<()> {
        self.fact().validate()?;
        if self.time_taken_ms < 0 {
            return Err(DrillError::validation(
                "time_taken_ms",
                format!("must not be negative, got {}", self.time_taken_ms),
            ));
        }
        Ok(())
    }
}

/// How a drawn fact is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Ask for the product: `7 × 8 = ?`.
    #[default]
    Direct,
    /// Ask for the multiplier given the product: `7 × ? = 56`.
    MissingFactor,
}

/// A fact drawn for a session, with the format it will be asked in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuestionCandidate {
    pub table: u32,
    pub multiplier: u32,
    /// Sampling weight the fact was drawn with (informational).
    pub weight: f64,
    pub kind: QuestionKind,
}

impl QuestionCandidate {
    pub fn new(fact: FactKey, weight: f64, kind: QuestionKind) -> Self {
        Self {
            table: fact.table,
            multiplier: fact.multiplier,
            weight,
            kind,
        }
    }

    pub fn fact(&self) -> FactKey {
        FactKey::new(self.table, self.multiplier)
    }

    /// Text shown to the learner.
    pub fn prompt(&self) -> String {
        match self.kind {
            QuestionKind::Direct => format!("{} × {} = ?", self.table, self.multiplier),
            QuestionKind::MissingFactor => {
                format!("{} × ? = {}", self.table, self.fact().product())
            }
        }
    }

    /// The number the learner is expected to type.
    pub fn expected_answer(&self) -> u32 {
        match self.kind {
            QuestionKind::Direct => self.fact().product(),
            QuestionKind::MissingFactor => self.multiplier,
        }
    }

    pub fn is_correct(&self, response: u32) -> bool {
        response == self.expected_answer()
    }

    /// Grade a response into an attempt on this fact.
    pub fn to_attempt(&self, response: u32, time_taken_ms: i64, timestamp: i64) -> Attempt {
        Attempt::new(
            self.table,
            self.multiplier,
            self.is_correct(response),
            time_taken_ms,
            timestamp,
        )
    }
}
