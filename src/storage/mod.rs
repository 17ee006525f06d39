//! Ledger storage for factdrill.
//!
//! Reference collaborators for persisting ledgers: a JSON file store and an
//! in-memory store behind the `LedgerStore` trait.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileLedgerStore;
pub use memory::MemoryLedgerStore;
pub use traits::{validate_learner_id, LedgerStore};
