//! CLI commands for factdrill.
//!
//! Each command wraps one library operation and renders its output as
//! human-readable text or JSON:
//! - **Practice**: session, answer
//! - **Inspection**: status, learners
//! - **Maintenance**: rehydrate

// Practice
pub mod answer;
pub mod session;

// Inspection
pub mod learners;
pub mod status;

// Maintenance
pub mod rehydrate;

pub use answer::AnswerCommand;
pub use learners::LearnersCommand;
pub use rehydrate::RehydrateCommand;
pub use session::SessionCommand;
pub use status::StatusCommand;
