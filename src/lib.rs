//! factdrill - Adaptive multiplication-fact scheduler
//!
//! factdrill keeps a per-learner ledger of table accuracy, response time and
//! per-fact streaks, advances the learner through the times tables as each
//! one is mastered, and composes weighted practice sessions that mix new
//! material with review of mastered tables.
//!
//! The scheduling core (`core`) is pure: every operation takes a ledger by
//! reference and returns a new one. Storage, the attempt log, configuration
//! and the CLI are collaborators layered on top.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod storage;

pub use config::Config;
pub use core::{
    classify, compose, replay, replay_onto, session_rng, update, Attempt, FactKey, FactStreak,
    Ledger, QuestionCandidate, QuestionKind, StatusSummary, TableStat, TableStatus, Tier,
};
pub use error::{DrillError, Result};
pub use history::{rehydrate, AttemptLog, DailyProgress, LoggedAttempt};
pub use storage::{FileLedgerStore, LedgerStore, MemoryLedgerStore};

// CLI commands
pub use cli::{AnswerCommand, LearnersCommand, RehydrateCommand, SessionCommand, StatusCommand};
