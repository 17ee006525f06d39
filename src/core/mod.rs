//! Core scheduling logic for factdrill.
//!
//! Everything here is synchronous and side-effect free: ledgers go in, new
//! ledgers or question lists come out. Persistence is left to the storage
//! and log modules.

pub mod composer;
pub mod fact;
pub mod ledger;
pub mod tier;
pub mod updater;
pub mod weighter;

pub use composer::{
    active_pool, compose, resolve_kind, review_pool, session_rng, Pool, ACTIVE_SHARE,
    MISSING_FACTOR_MIN_STREAK, MISSING_FACTOR_PROBABILITY,
};
pub use fact::{Attempt, FactKey, QuestionCandidate, QuestionKind, MAX_FACTOR};
pub use ledger::{
    FactStreak, Ledger, StatusSummary, TableStat, TableStatus, DEFAULT_DAILY_GOAL,
    DEFAULT_TARGET_ACCURACY,
};
pub use tier::{Tier, DEFAULT_STAGE, FAIR_START_STAGE};
pub use updater::{classify, replay, replay_onto, update};
pub use weighter::{injected_candidates, weigh_table, weight, WeightedFact};
