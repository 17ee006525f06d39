//! Attempt history for factdrill.
//!
//! The attempt log (`<home>/attempts/<learner>.jsonl`) records every applied
//! attempt in order. Replaying it rebuilds the ledger when the stored copy
//! is lost or suspected corrupt.

pub mod log;
pub mod progress;

pub use log::{rehydrate, AttemptLog, LoggedAttempt, ATTEMPT_LOG_SCHEMA_VERSION};
pub use progress::{count_between, DailyProgress};
