//! Session composer.
//!
//! Builds the ordered list of questions for one practice session:
//! 1. Active pool: the current stage table over the tier's multipliers,
//!    plus any injected next-table facts
//! 2. Review pool: mastered tables below the current stage
//! 3. 70% of the slots (rounded down) come from the active pool, the rest
//!    from the review pool, or from the active pool if nothing is mastered yet
//! 4. Each drawn fact is asked directly, or as a missing factor once its
//!    streak is long enough
//!
//! Draws are weighted and with replacement. The caller supplies the random
//! source, so a seeded `ChaCha8Rng` reproduces a session exactly.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::fact::{FactKey, QuestionCandidate, QuestionKind};
use crate::core::ledger::Ledger;
use crate::core::tier::Tier;
use crate::core::weighter::{injected_candidates, weigh_table, WeightedFact};

/// Share of the session drawn from the active pool.
pub const ACTIVE_SHARE: f64 = 0.7;

/// Streak at which a fact may be asked as a missing factor.
pub const MISSING_FACTOR_MIN_STREAK: u32 = 5;

/// Chance an eligible fact is asked as a missing factor.
pub const MISSING_FACTOR_PROBABILITY: f64 = 0.2;

/// A weighted pool of facts to draw from.
#[derive(Debug, Clone)]
pub struct Pool {
    facts: Vec<WeightedFact>,
    index: Option<WeightedIndex<f64>>,
}

impl Pool {
    pub fn new(facts: Vec<WeightedFact>) -> Self {
        // Fails only for an empty pool or an all-zero pool; both fall back
        // to uniform draws in `draw`.
        let index = WeightedIndex::new(facts.iter().map(|f| f.weight)).ok();
        Self { facts, index }
    }

    pub fn facts(&self) -> &[WeightedFact] {
        &self.facts
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Draw one fact, with replacement. `None` only for an empty pool.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Option<WeightedFact> {
        if self.facts.is_empty() {
            return None;
        }
        let i = match &self.index {
            Some(index) => index.sample(rng),
            None => rng.gen_range(0..self.facts.len()),
        };
        Some(self.facts[i])
    }
}

/// The current stage table plus injected next-table facts.
pub fn active_pool(ledger: &Ledger, tier: Tier) -> Pool {
    let stage = ledger.current_stage;
    let mut facts = weigh_table(ledger, stage, &tier.allowed_multipliers(stage));
    facts.extend(injected_candidates(ledger, tier));
    Pool::new(facts)
}

/// Every allowed fact of every mastered table below the current stage.
///
/// Review tables use the multiplier range of the current stage, not the range
/// that applied when each table was learned.
pub fn review_pool(ledger: &Ledger, tier: Tier) -> Pool {
    let multipliers = tier.allowed_multipliers(ledger.current_stage);
    let facts = ledger
        .mastered_below_stage()
        .into_iter()
        .flat_map(|table| weigh_table(ledger, table, &multipliers))
        .collect();
    Pool::new(facts)
}

/// Number of slots filled from the active pool.
pub fn active_slots(session_length: usize) -> usize {
    (session_length as f64 * ACTIVE_SHARE).floor() as usize
}

/// Decide how a drawn fact is asked.
///
/// Only facts with a streak of at least 5 can become missing-factor
/// questions; ineligible facts do not consume randomness.
pub fn resolve_kind<R: Rng>(ledger: &Ledger, fact: FactKey, rng: &mut R) -> QuestionKind {
    if ledger.streak_for(fact).streak < MISSING_FACTOR_MIN_STREAK {
        return QuestionKind::Direct;
    }
    if rng.gen_bool(MISSING_FACTOR_PROBABILITY) {
        QuestionKind::MissingFactor
    } else {
        QuestionKind::Direct
    }
}

/// Compose a session of exactly `session_length` questions.
///
/// Active-pool questions come first, review questions after them.
pub fn compose<R: Rng>(
    ledger: &Ledger,
    tier: Tier,
    session_length: usize,
    rng: &mut R,
) -> Vec<QuestionCandidate> {
    let active = active_pool(ledger, tier);
    let review = review_pool(ledger, tier);

    let from_active = if review.is_empty() {
        session_length
    } else {
        active_slots(session_length)
    };

    tracing::debug!(
        stage = ledger.current_stage,
        active_facts = active.facts().len(),
        review_facts = review.facts().len(),
        from_active,
        from_review = session_length - from_active,
        "composing session"
    );

    let mut questions = Vec::with_capacity(session_length);
    for slot in 0..session_length {
        let pool = if slot < from_active { &active } else { &review };
        if let Some(drawn) = pool.draw(rng) {
            let kind = resolve_kind(ledger, drawn.fact, rng);
            questions.push(QuestionCandidate::new(drawn.fact, drawn.weight, kind));
        }
    }
    questions
}

/// Build the session random source: seeded when a seed is given, otherwise
/// seeded from the thread RNG.
pub fn session_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::seed_from_u64(rand::random()),
    }
}
