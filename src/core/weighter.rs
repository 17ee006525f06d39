//! Candidate weighting for session sampling.
//!
//! Weights bias the session composer toward facts the learner is getting
//! wrong and away from facts that are already well drilled. Weighting is
//! deterministic; all randomness lives in the composer.
//!
//! Policy:
//! - Base weight: 10
//! - Recently missed (streak 0, attempted before): x3
//! - Well drilled (streak above 5): x0.5
//!
//! Smart injection previews the next table: once the current stage's
//! accuracy passes 70% of the mastery threshold, its two easiest facts join
//! the active pool at a fixed weight.

use crate::core::fact::FactKey;
use crate::core::ledger::Ledger;
use crate::core::tier::Tier;

/// Weighting constants.
pub mod weights {
    /// Starting weight for every fact.
    pub const BASE: f64 = 10.0;
    /// Multiplier for facts whose streak was just broken.
    pub const RECENTLY_MISSED: f64 = 3.0;
    /// Multiplier for facts with a long streak.
    pub const WELL_DRILLED: f64 = 0.5;
    /// Streaks strictly above this count as well drilled.
    pub const WELL_DRILLED_STREAK: u32 = 5;
    /// Fixed weight for injected next-table facts.
    pub const INJECTED: f64 = 20.0;
    /// Current-stage accuracy above which the next table is previewed
    /// (70% of the 90% mastery bar).
    pub const INJECTION_ACCURACY: f64 = 63.0;
    /// Multipliers of the next table that get previewed.
    pub const INJECTED_MULTIPLIERS: [u32; 2] = [2, 3];
}

/// A fact paired with its sampling weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedFact {
    pub fact: FactKey,
    pub weight: f64,
}

impl WeightedFact {
    pub fn new(fact: FactKey, weight: f64) -> Self {
        Self { fact, weight }
    }
}

/// Sampling weight for `table × multiplier`. Always non-negative.
///
/// "Recently missed" is inferred from a zero streak on a fact that has been
/// attempted, so slow-but-correct answers get the boost too.
pub fn weight(ledger: &Ledger, table: u32, multiplier: u32) -> f64 {
    let streak = ledger.streak_for(FactKey::new(table, multiplier));

    let mut w = weights::BASE;
    if streak.streak == 0 && streak.was_attempted() {
        w *= weights::RECENTLY_MISSED;
    }
    if streak.streak > weights::WELL_DRILLED_STREAK {
        w *= weights::WELL_DRILLED;
    }
    w
}

/// Whether the learner is doing well enough to preview the next table.
pub fn should_inject(ledger: &Ledger, tier: Tier) -> bool {
    let next_table = ledger.current_stage + 1;
    if next_table > tier.max_stage() {
        return false;
    }
    ledger.table_stat(ledger.current_stage).accuracy > weights::INJECTION_ACCURACY
}

/// Next-table facts to add to the active pool, if injection applies.
pub fn injected_candidates(ledger: &Ledger, tier: Tier) -> Vec<WeightedFact> {
    if !should_inject(ledger, tier) {
        return Vec::new();
    }
    let next_table = ledger.current_stage + 1;
    weights::INJECTED_MULTIPLIERS
        .iter()
        .map(|m| WeightedFact::new(FactKey::new(next_table, *m), weights::INJECTED))
        .collect()
}

/// Weighted facts for `table` over the given multipliers.
pub fn weigh_table(ledger: &Ledger, table: u32, multipliers: &[u32]) -> Vec<WeightedFact> {
    multipliers
        .iter()
        .map(|m| WeightedFact::new(FactKey::new(table, *m), weight(ledger, table, *m)))
        .collect()
}
