//! Ledger updater.
//!
//! Applies one attempt to a ledger and returns the new ledger. The input is
//! never modified; the new value is built from a deep clone, so callers can
//! keep the old ledger around (for undo, comparison, or replay checks).
//!
//! Order of work for each attempt:
//! 1. Fair start placement (advanced tier, brand-new learner)
//! 2. Table statistics (EMA accuracy and time, attempt count)
//! 3. Status classification, recomputed from scratch
//! 4. Fact streak
//! 5. Stage advancement
//!
//! EMAs and streaks depend on order, so attempts for one learner must be
//! applied in the order they happened.

use crate::core::fact::Attempt;
use crate::core::ledger::{FactStreak, Ledger, TableStat, TableStatus};
use crate::core::tier::{Tier, DEFAULT_STAGE, FAIR_START_STAGE};
use crate::error::{DrillError, Result};

/// Classification and smoothing constants.
pub mod thresholds {
    /// Weight kept from the previous time average.
    pub const TIME_DECAY: f64 = 0.9;
    /// Weight given to the new response time.
    pub const TIME_WEIGHT: f64 = 0.1;
    /// Weight kept from the previous accuracy average.
    pub const ACCURACY_DECAY: f64 = 0.95;
    /// Weight given to the new score.
    pub const ACCURACY_WEIGHT: f64 = 0.05;

    /// Fast-track mastery: perfect accuracy (advanced only).
    pub const FAST_TRACK_ACCURACY: f64 = 100.0;
    /// Fast-track mastery: average time below this many ms.
    pub const FAST_TRACK_TIME_MS: f64 = 2500.0;
    /// Fast-track mastery: at least this many attempts.
    pub const FAST_TRACK_MIN_ATTEMPTS: u32 = 10;

    /// Regular mastery: accuracy at or above.
    pub const MASTERY_ACCURACY: f64 = 90.0;
    /// Regular mastery: average time below this many ms.
    pub const MASTERY_TIME_MS: f64 = 4000.0;
    /// Regular mastery: strictly more attempts than this.
    pub const MASTERY_MIN_ATTEMPTS: u32 = 20;

    /// Focus needed: accuracy below.
    pub const FOCUS_ACCURACY: f64 = 70.0;
    /// Focus needed: average time above this many ms.
    pub const FOCUS_TIME_MS: f64 = 10_000.0;

    /// Correct answers at or above this many ms break the streak.
    pub const SLOW_ANSWER_MS: i64 = 3000;
}

/// Apply one attempt, returning the new ledger.
///
/// Fails with [`DrillError::Validation`] when the attempt is malformed; no
/// part of the attempt is applied in that case.
pub fn update(ledger: &Ledger, attempt: &Attempt, tier: Tier) -> Result<Ledger> {
    attempt.validate()?;

    let mut next = ledger.clone();

    if qualifies_for_fair_start(&next, tier) {
        tracing::info!(
            "fair start: placing fresh {} learner on stage {}",
            tier,
            FAIR_START_STAGE
        );
        next.current_stage = FAIR_START_STAGE;
    }

    let stat = next.table_stats.entry(attempt.table).or_default();
    apply_to_table(stat, attempt);
    stat.status = classify(stat, tier);
    let status = stat.status;

    let streak = next.fact_streaks.entry(attempt.fact()).or_default();
    apply_to_streak(streak, attempt);

    if attempt.table == next.current_stage && status == TableStatus::Mastered {
        if next.current_stage < tier.max_stage() {
            next.current_stage += 1;
            tracing::info!(
                "table {} mastered, advancing to stage {}",
                attempt.table,
                next.current_stage
            );
        } else {
            tracing::debug!(
                "table {} mastered at the {} stage ceiling",
                attempt.table,
                tier
            );
        }
    }

    tracing::debug!(
        fact = %attempt.fact(),
        correct = attempt.is_correct,
        time_ms = attempt.time_taken_ms,
        status = status.display_name(),
        stage = next.current_stage,
        "applied attempt"
    );

    Ok(next)
}

/// Rebuild a ledger from a learner's full attempt history.
///
/// Attempts are applied in slice order starting from a default ledger.
pub fn replay(attempts: &[Attempt], tier: Tier) -> Result<Ledger> {
    replay_onto(&Ledger::default(), attempts, tier)
}

/// Apply a sequence of attempts on top of an existing ledger.
///
/// A malformed attempt fails the whole replay; the error names its
/// 1-based position.
pub fn replay_onto(ledger: &Ledger, attempts: &[Attempt], tier: Tier) -> Result<Ledger> {
    let mut current = ledger.clone();
    for (index, attempt) in attempts.iter().enumerate() {
        current = update(&current, attempt, tier).map_err(|e| match e {
            DrillError::Validation { field, message } => DrillError::validation(
                field,
                format!("attempt #{}: {}", index + 1, message),
            ),
            other => other,
        })?;
    }
    Ok(current)
}

/// Classify a table from its current aggregates.
///
/// There is no sticky state: a mastered table drops back to practicing or
/// focus-needed as soon as its averages fall under the thresholds.
pub fn classify(stat: &TableStat, tier: Tier) -> TableStatus {
    use thresholds::*;

    let fast_track = tier == Tier::Advanced
        && stat.accuracy == FAST_TRACK_ACCURACY
        && stat.avg_time < FAST_TRACK_TIME_MS
        && stat.total_attempts >= FAST_TRACK_MIN_ATTEMPTS;

    if fast_track {
        TableStatus::Mastered
    } else if stat.accuracy >= MASTERY_ACCURACY
        && stat.avg_time < MASTERY_TIME_MS
        && stat.total_attempts > MASTERY_MIN_ATTEMPTS
    {
        TableStatus::Mastered
    } else if stat.accuracy < FOCUS_ACCURACY || stat.avg_time > FOCUS_TIME_MS {
        TableStatus::FocusNeeded
    } else {
        TableStatus::Practicing
    }
}

/// Advanced learner on the default stage who has never practiced.
fn qualifies_for_fair_start(ledger: &Ledger, tier: Tier) -> bool {
    tier.has_fair_start() && ledger.current_stage == DEFAULT_STAGE && ledger.is_fresh()
}

fn apply_to_table(stat: &mut TableStat, attempt: &Attempt) {
    use thresholds::*;

    let score = if attempt.is_correct { 100.0 } else { 0.0 };
    let time = attempt.time_taken_ms as f64;

    if stat.total_attempts == 0 {
        stat.avg_time = time;
        stat.accuracy = score;
    } else {
        stat.avg_time = stat.avg_time * TIME_DECAY + time * TIME_WEIGHT;
        stat.accuracy = stat.accuracy * ACCURACY_DECAY + score * ACCURACY_WEIGHT;
    }
    stat.total_attempts += 1;
    stat.last_practiced = Some(attempt.timestamp);
}

fn apply_to_streak(streak: &mut FactStreak, attempt: &Attempt) {
    if attempt.is_correct && attempt.time_taken_ms < thresholds::SLOW_ANSWER_MS {
        streak.streak += 1;
    } else {
        streak.streak = 0;
    }
    streak.last_attempt = attempt.timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fact::FactKey;

    const T0: i64 = 1_700_000_000_000;

    fn attempt(table: u32, multiplier: u32, correct: bool, ms: i64, n: i64) -> Attempt {
        Attempt::new(table, multiplier, correct, ms, T0 + n * 1000)
    }

    fn streak_after(ledger: &Ledger, fact: FactKey) -> u32 {
        ledger.streak_for(fact).streak
    }

    fn apply_all(ledger: &Ledger, attempts: &[Attempt], tier: Tier) -> Ledger {
        attempts
            .iter()
            .fold(ledger.clone(), |l, a| update(&l, a, tier).unwrap())
    }

    // Scenario tests

    #[test]
    fn test_fresh_advanced_learner_gets_fair_start() {
        let ledger = Ledger::default();
        let next = update(&ledger, &attempt(5, 3, true, 1800, 0), Tier::Advanced).unwrap();

        assert_eq!(next.current_stage, 11);
        let stat = next.table_stat(5);
        assert_eq!(stat.status, TableStatus::Practicing);
        assert!((stat.accuracy - 100.0).abs() < f64::EPSILON);
        assert!((stat.avg_time - 1800.0).abs() < f64::EPSILON);
        assert_eq!(stat.total_attempts, 1);
        assert_eq!(stat.last_practiced, Some(T0));
    }

    #[test]
    fn test_fast_track_classification() {
        let stat = TableStat {
            status: TableStatus::Practicing,
            accuracy: 100.0,
            avg_time: 2000.0,
            total_attempts: 10,
            last_practiced: Some(T0),
        };
        assert_eq!(classify(&stat, Tier::Advanced), TableStatus::Mastered);
        // Basic learners need the regular attempt count.
        assert_eq!(classify(&stat, Tier::Basic), TableStatus::Practicing);
    }

    #[test]
    fn test_fast_track_through_updates() {
        let ledger = update(&Ledger::default(), &attempt(11, 2, true, 2000, 0), Tier::Advanced)
            .unwrap();
        assert_eq!(ledger.current_stage, 11);

        let attempts: Vec<Attempt> = (1..10)
            .map(|n| attempt(11, 2 + (n as u32 % 8), true, 2000, n))
            .collect();
        let ledger = apply_all(&ledger, &attempts, Tier::Advanced);

        assert_eq!(ledger.table_stat(11).total_attempts, 10);
        assert_eq!(ledger.table_stat(11).status, TableStatus::Mastered);
        assert_eq!(ledger.current_stage, 12);
    }

    // Fair start edge cases

    #[test]
    fn test_no_fair_start_for_basic() {
        let next = update(&Ledger::default(), &attempt(2, 3, true, 1800, 0), Tier::Basic).unwrap();
        assert_eq!(next.current_stage, 2);
    }

    #[test]
    fn test_no_fair_start_with_history() {
        let ledger = update(&Ledger::default(), &attempt(2, 3, true, 1800, 0), Tier::Basic).unwrap();
        let next = update(&ledger, &attempt(2, 4, true, 1800, 1), Tier::Advanced).unwrap();
        assert_eq!(next.current_stage, 2);
    }

    #[test]
    fn test_no_fair_start_off_default_stage() {
        let ledger = Ledger {
            current_stage: 4,
            ..Ledger::default()
        };
        let next = update(&ledger, &attempt(4, 3, true, 1800, 0), Tier::Advanced).unwrap();
        assert_eq!(next.current_stage, 4);
    }

    // Table statistics

    #[test]
    fn test_ema_after_first_attempt() {
        let ledger = update(&Ledger::default(), &attempt(3, 3, true, 2000, 0), Tier::Basic).unwrap();
        let ledger = update(&ledger, &attempt(3, 4, false, 4000, 1), Tier::Basic).unwrap();

        let stat = ledger.table_stat(3);
        assert!((stat.avg_time - 2200.0).abs() < 1e-9);
        assert!((stat.accuracy - 95.0).abs() < 1e-9);
        assert_eq!(stat.total_attempts, 2);
        assert_eq!(stat.last_practiced, Some(T0 + 1000));
    }

    #[test]
    fn test_first_attempt_incorrect_sets_zero_accuracy() {
        let ledger = update(&Ledger::default(), &attempt(3, 3, false, 5000, 0), Tier::Basic).unwrap();
        let stat = ledger.table_stat(3);
        assert!(stat.accuracy.abs() < f64::EPSILON);
        assert_eq!(stat.status, TableStatus::FocusNeeded);
    }

    #[test]
    fn test_slow_average_is_focus_needed() {
        let ledger = update(&Ledger::default(), &attempt(3, 3, true, 12_000, 0), Tier::Basic).unwrap();
        assert_eq!(ledger.table_stat(3).status, TableStatus::FocusNeeded);
    }

    #[test]
    fn test_other_tables_untouched() {
        let ledger = update(&Ledger::default(), &attempt(3, 3, true, 2000, 0), Tier::Basic).unwrap();
        let next = update(&ledger, &attempt(4, 3, true, 2000, 1), Tier::Basic).unwrap();
        assert_eq!(next.table_stat(3), ledger.table_stat(3));
    }

    // Status classification

    #[test]
    fn test_regular_mastery_needs_more_than_twenty() {
        let mut stat = TableStat {
            status: TableStatus::Practicing,
            accuracy: 92.0,
            avg_time: 3500.0,
            total_attempts: 20,
            last_practiced: None,
        };
        assert_eq!(classify(&stat, Tier::Basic), TableStatus::Practicing);
        stat.total_attempts = 21;
        assert_eq!(classify(&stat, Tier::Basic), TableStatus::Mastered);
    }

    #[test]
    fn test_boundaries() {
        let base = TableStat {
            status: TableStatus::NotStarted,
            accuracy: 70.0,
            avg_time: 10_000.0,
            total_attempts: 5,
            last_practiced: None,
        };
        // Exactly 70% and exactly 10s are still practicing.
        assert_eq!(classify(&base, Tier::Basic), TableStatus::Practicing);

        let low = TableStat {
            accuracy: 69.9,
            ..base
        };
        assert_eq!(classify(&low, Tier::Basic), TableStatus::FocusNeeded);

        let slow = TableStat {
            avg_time: 10_000.1,
            ..base
        };
        assert_eq!(classify(&slow, Tier::Basic), TableStatus::FocusNeeded);
    }

    #[test]
    fn test_mastered_status_can_regress() {
        // Mastery is recomputed every attempt; it is not a permanent badge.
        let mut ledger = Ledger::default();
        ledger.table_stats.insert(
            3,
            TableStat {
                status: TableStatus::Mastered,
                accuracy: 91.0,
                avg_time: 3000.0,
                total_attempts: 30,
                last_practiced: Some(T0),
            },
        );

        let after_one_miss = update(&ledger, &attempt(3, 4, false, 3000, 1), Tier::Basic).unwrap();
        assert_eq!(after_one_miss.table_stat(3).status, TableStatus::Practicing);

        let misses: Vec<Attempt> = (2..10).map(|n| attempt(3, 4, false, 3000, n)).collect();
        let after_many = apply_all(&after_one_miss, &misses, Tier::Basic);
        assert_eq!(after_many.table_stat(3).status, TableStatus::FocusNeeded);
    }

    // Streaks

    #[test]
    fn test_streak_increments_on_fast_correct() {
        let attempts: Vec<Attempt> = (0..3).map(|n| attempt(7, 7, true, 2999, n)).collect();
        let ledger = apply_all(&Ledger::default(), &attempts, Tier::Basic);
        assert_eq!(streak_after(&ledger, FactKey::new(7, 7)), 3);
        assert_eq!(ledger.streak_for(FactKey::new(7, 7)).last_attempt, T0 + 2000);
    }

    #[test]
    fn test_streak_resets_on_incorrect() {
        let mut attempts: Vec<Attempt> = (0..4).map(|n| attempt(7, 7, true, 1000, n)).collect();
        attempts.push(attempt(7, 7, false, 1000, 4));
        let ledger = apply_all(&Ledger::default(), &attempts, Tier::Basic);
        assert_eq!(streak_after(&ledger, FactKey::new(7, 7)), 0);
    }

    #[test]
    fn test_streak_resets_on_slow_correct() {
        let mut attempts: Vec<Attempt> = (0..4).map(|n| attempt(7, 7, true, 1000, n)).collect();
        attempts.push(attempt(7, 7, true, 3000, 4));
        let ledger = apply_all(&Ledger::default(), &attempts, Tier::Basic);
        assert_eq!(streak_after(&ledger, FactKey::new(7, 7)), 0);
    }

    #[test]
    fn test_streak_is_per_fact() {
        let attempts = [attempt(7, 7, true, 1000, 0), attempt(7, 8, false, 1000, 1)];
        let ledger = apply_all(&Ledger::default(), &attempts, Tier::Basic);
        assert_eq!(streak_after(&ledger, FactKey::new(7, 7)), 1);
        assert_eq!(streak_after(&ledger, FactKey::new(7, 8)), 0);
    }

    // Stage advancement

    /// One more fast correct answer pushes this over the regular mastery bar.
    fn nearly_mastered() -> TableStat {
        TableStat {
            status: TableStatus::Practicing,
            accuracy: 95.0,
            avg_time: 2000.0,
            total_attempts: 20,
            last_practiced: Some(T0),
        }
    }

    #[test]
    fn test_stage_advances_on_mastering_current_table() {
        let mut ledger = Ledger {
            current_stage: 4,
            ..Ledger::default()
        };
        ledger.table_stats.insert(4, nearly_mastered());

        let next = update(&ledger, &attempt(4, 6, true, 2000, 0), Tier::Basic).unwrap();
        assert_eq!(next.table_stat(4).status, TableStatus::Mastered);
        assert_eq!(next.current_stage, 5);
    }

    #[test]
    fn test_mastering_other_table_does_not_advance() {
        let mut ledger = Ledger {
            current_stage: 4,
            ..Ledger::default()
        };
        ledger.table_stats.insert(3, nearly_mastered());

        let next = update(&ledger, &attempt(3, 6, true, 2000, 0), Tier::Basic).unwrap();
        assert_eq!(next.table_stat(3).status, TableStatus::Mastered);
        assert_eq!(next.current_stage, 4);
    }

    #[test]
    fn test_stage_capped_for_basic() {
        let mut ledger = Ledger {
            current_stage: 12,
            ..Ledger::default()
        };
        ledger.table_stats.insert(12, nearly_mastered());

        let next = update(&ledger, &attempt(12, 6, true, 2000, 0), Tier::Basic).unwrap();
        assert_eq!(next.table_stat(12).status, TableStatus::Mastered);
        assert_eq!(next.current_stage, 12);
    }

    #[test]
    fn test_stage_capped_for_advanced() {
        let mut ledger = Ledger {
            current_stage: 20,
            ..Ledger::default()
        };
        ledger.table_stats.insert(20, nearly_mastered());

        let next = update(&ledger, &attempt(20, 6, true, 2000, 0), Tier::Advanced).unwrap();
        assert_eq!(next.current_stage, 20);
    }

    #[test]
    fn test_stage_above_ceiling_never_decreases() {
        let mut ledger = Ledger {
            current_stage: 15,
            ..Ledger::default()
        };
        ledger.table_stats.insert(15, nearly_mastered());

        let next = update(&ledger, &attempt(15, 6, true, 2000, 0), Tier::Basic).unwrap();
        assert_eq!(next.current_stage, 15);
    }

    // Validation

    #[test]
    fn test_invalid_attempt_leaves_ledger_unchanged() {
        let ledger = update(&Ledger::default(), &attempt(3, 3, true, 2000, 0), Tier::Basic).unwrap();
        let before = ledger.clone();

        let err = update(&ledger, &attempt(3, 3, true, -5, 1), Tier::Basic).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(ledger, before);

        assert!(update(&ledger, &attempt(0, 3, true, 5, 1), Tier::Basic).is_err());
        assert!(update(&ledger, &attempt(3, 0, true, 5, 1), Tier::Basic).is_err());
    }

    #[test]
    fn test_update_does_not_touch_input() {
        let ledger = Ledger::default();
        let _ = update(&ledger, &attempt(5, 3, true, 1800, 0), Tier::Advanced).unwrap();
        assert_eq!(ledger, Ledger::default());
    }

    // Replay

    #[test]
    fn test_replay_matches_incremental() {
        let attempts: Vec<Attempt> = (0..60)
            .map(|n| attempt(2 + (n as u32 % 3), 1 + (n as u32 % 10), n % 4 != 0, 1000 + n * 97, n))
            .collect();

        let incremental = apply_all(&Ledger::default(), &attempts, Tier::Basic);
        let replayed = replay(&attempts, Tier::Basic).unwrap();
        assert_eq!(incremental, replayed);

        // Idempotent.
        assert_eq!(replay(&attempts, Tier::Basic).unwrap(), replayed);
    }

    #[test]
    fn test_replay_onto_continues_from_ledger() {
        let attempts: Vec<Attempt> = (0..10).map(|n| attempt(2, 3, true, 1500, n)).collect();
        let (head, tail) = attempts.split_at(4);

        let partial = replay(head, Tier::Basic).unwrap();
        let resumed = replay_onto(&partial, tail, Tier::Basic).unwrap();
        assert_eq!(resumed, replay(&attempts, Tier::Basic).unwrap());
    }

    #[test]
    fn test_replay_reports_bad_attempt_position() {
        let attempts = [
            attempt(2, 3, true, 1500, 0),
            attempt(2, 3, true, 1500, 1),
            attempt(2, 0, true, 1500, 2),
        ];
        let err = replay(&attempts, Tier::Basic).unwrap_err();
        assert!(err.to_string().contains("attempt #3"));
        assert!(err.to_string().contains("multiplier"));
    }

    #[test]
    fn test_replay_empty_history_is_default() {
        assert_eq!(replay(&[], Tier::Advanced).unwrap(), Ledger::default());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_tier() -> impl Strategy<Value = Tier> {
            prop_oneof![Just(Tier::Basic), Just(Tier::Advanced)]
        }

        fn arb_attempt() -> impl Strategy<Value = Attempt> {
            (1u32..=20, 1u32..=12, any::<bool>(), 0i64..15_000, 0i64..1_000_000)
                .prop_map(|(t, m, c, ms, ts)| Attempt::new(t, m, c, ms, T0 + ts))
        }

        proptest! {
            // Property: replay equals incremental application
            #[test]
            fn prop_replay_deterministic(
                attempts in prop::collection::vec(arb_attempt(), 0..80),
                tier in arb_tier(),
            ) {
                let incremental = apply_all(&Ledger::default(), &attempts, tier);
                let replayed = replay(&attempts, tier).unwrap();
                prop_assert_eq!(incremental, replayed);
            }

            // Property: each attempt adds exactly one to its table only
            #[test]
            fn prop_total_attempts_monotonic(
                attempts in prop::collection::vec(arb_attempt(), 1..60),
                tier in arb_tier(),
            ) {
                let mut ledger = Ledger::default();
                for a in &attempts {
                    let next = update(&ledger, a, tier).unwrap();
                    for table in 1..=20u32 {
                        let before = ledger.table_stat(table).total_attempts;
                        let after = next.table_stat(table).total_attempts;
                        if table == a.table {
                            prop_assert_eq!(after, before + 1);
                        } else {
                            prop_assert_eq!(after, before);
                        }
                    }
                    ledger = next;
                }
            }

            // Property: stage never decreases and never passes the ceiling
            #[test]
            fn prop_stage_monotonic_and_capped(
                attempts in prop::collection::vec(arb_attempt(), 1..120),
                tier in arb_tier(),
            ) {
                let mut ledger = Ledger::default();
                for a in &attempts {
                    let next = update(&ledger, a, tier).unwrap();
                    prop_assert!(next.current_stage >= ledger.current_stage);
                    prop_assert!(next.current_stage <= tier.max_stage());
                    ledger = next;
                }
            }

            // Property: wrong or slow answers always zero the streak
            #[test]
            fn prop_streak_reset(
                history in prop::collection::vec(arb_attempt(), 0..30),
                last in arb_attempt(),
                tier in arb_tier(),
            ) {
                let ledger = apply_all(&Ledger::default(), &history, tier);
                let before = streak_after(&ledger, last.fact());
                let next = update(&ledger, &last, tier).unwrap();
                let after = streak_after(&next, last.fact());

                if !last.is_correct || last.time_taken_ms >= thresholds::SLOW_ANSWER_MS {
                    prop_assert_eq!(after, 0);
                } else {
                    prop_assert_eq!(after, before + 1);
                }
            }

            // Property: accuracy stays within 0..=100
            #[test]
            fn prop_accuracy_bounded(
                attempts in prop::collection::vec(arb_attempt(), 1..60),
                tier in arb_tier(),
            ) {
                let ledger = apply_all(&Ledger::default(), &attempts, tier);
                for stat in ledger.table_stats.values() {
                    prop_assert!(stat.accuracy >= 0.0 && stat.accuracy <= 100.0 + 1e-9);
                }
            }
        }
    }
}
