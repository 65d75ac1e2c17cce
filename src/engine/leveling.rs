// src/engine/leveling.rs

use std::collections::BTreeMap;

use crate::{
    engine::scoring::ScoredAttempt,
    models::{
        attempt::Attempt,
        learner::{LearnerIdentity, LearnerRecord, WeakArea},
    },
};

/// Number of most recent attempts averaged into the level.
pub const ROLLING_WINDOW: usize = 5;
/// Percentage points covered by one level.
pub const LEVEL_BAND: f64 = 25.0;
pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 10;

/// `score / max(1, total)` as a percentage.
pub fn attempt_percentage(attempt: &Attempt) -> f64 {
    f64::from(attempt.score) / f64::from(attempt.total.max(1)) * 100.0
}

/// Mean percentage of the last `ROLLING_WINDOW` attempts, 0 for an empty history.
pub fn rolling_average(history: &[Attempt]) -> f64 {
    let recent = &history[history.len().saturating_sub(ROLLING_WINDOW)..];
    if recent.is_empty() {
        return 0.0;
    }
    recent.iter().map(attempt_percentage).sum::<f64>() / recent.len() as f64
}

pub fn level_for(average: f64) -> i32 {
    let raw = (average / LEVEL_BAND).ceil();
    if raw.is_nan() {
        return MIN_LEVEL;
    }
    (raw as i32).clamp(MIN_LEVEL, MAX_LEVEL)
}

/// Sums new per-topic counts into the existing weak areas,
/// sorted by descending count (ties by topic).
pub fn merge_weak_areas(existing: &[WeakArea], fresh: &BTreeMap<String, u32>) -> Vec<WeakArea> {
    let mut merged: BTreeMap<&str, u32> = BTreeMap::new();
    for w in existing {
        *merged.entry(w.topic.as_str()).or_insert(0) += w.incorrect_count;
    }
    for (topic, count) in fresh {
        *merged.entry(topic.as_str()).or_insert(0) += count;
    }

    let mut out: Vec<WeakArea> = merged
        .into_iter()
        .map(|(topic, incorrect_count)| WeakArea {
            topic: topic.to_string(),
            incorrect_count,
        })
        .collect();
    out.sort_by(|a, b| {
        b.incorrect_count
            .cmp(&a.incorrect_count)
            .then_with(|| a.topic.cmp(&b.topic))
    });
    out
}

/// Folds a scored attempt into a learner's record, creating it when absent.
/// Returns the new record; the input is consumed, never patched in place.
pub fn fold_attempt(
    record: Option<LearnerRecord>,
    identity: &LearnerIdentity,
    scored: ScoredAttempt,
    now: chrono::DateTime<chrono::Utc>,
) -> LearnerRecord {
    let base = record.unwrap_or_else(|| LearnerRecord {
        email: identity.email.clone(),
        name: identity.display_name(),
        level: MIN_LEVEL,
        attempts: Vec::new(),
        weak_areas: Vec::new(),
        created_at: now,
        updated_at: now,
    });

    let weak_areas = merge_weak_areas(&base.weak_areas, &scored.topic_incorrect);

    let mut attempts = base.attempts;
    attempts.push(scored.attempt);
    let level = level_for(rolling_average(&attempts));

    LearnerRecord {
        level,
        attempts,
        weak_areas,
        updated_at: now,
        ..base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn attempt(score: i32, total: i32) -> Attempt {
        Attempt {
            attempt_id: Uuid::new_v4(),
            score,
            total,
            per_question: Vec::new(),
            attempted_at: chrono::Utc::now(),
            time_taken_secs: None,
        }
    }

    fn scored(score: i32, total: i32, topics: &[(&str, u32)]) -> ScoredAttempt {
        ScoredAttempt {
            attempt: attempt(score, total),
            topic_incorrect: topics.iter().map(|(t, c)| (t.to_string(), *c)).collect(),
        }
    }

    fn identity() -> LearnerIdentity {
        LearnerIdentity {
            email: "sam@example.com".to_string(),
            name: None,
        }
    }

    #[test]
    fn first_attempt_at_75_percent_gives_level_3() {
        let record = fold_attempt(None, &identity(), scored(3, 4, &[("supply", 1)]), chrono::Utc::now());
        assert_eq!(record.level, 3);
        assert_eq!(record.name, "sam");
        assert_eq!(record.attempts.len(), 1);
        assert_eq!(
            record.weak_areas,
            vec![WeakArea { topic: "supply".to_string(), incorrect_count: 1 }]
        );
    }

    #[test]
    fn five_perfect_attempts_give_level_4() {
        let mut record = None;
        for _ in 0..5 {
            record = Some(fold_attempt(record, &identity(), scored(4, 4, &[]), chrono::Utc::now()));
        }
        let record = record.unwrap();
        assert_eq!(record.attempts.len(), 5);
        assert_eq!(record.level, 4);
    }

    #[test]
    fn only_last_five_attempts_count() {
        let mut history: Vec<Attempt> = (0..3).map(|_| attempt(0, 10)).collect();
        history.extend((0..5).map(|_| attempt(10, 10)));
        assert_eq!(rolling_average(&history), 100.0);
        assert_eq!(level_for(rolling_average(&history)), 4);
    }

    #[test]
    fn zero_total_uses_divisor_of_one() {
        assert_eq!(attempt_percentage(&attempt(0, 0)), 0.0);
        assert_eq!(rolling_average(&[attempt(0, 0)]), 0.0);
        assert_eq!(level_for(0.0), MIN_LEVEL);
    }

    #[test]
    fn level_is_always_within_bounds() {
        for avg in [-50.0, 0.0, 0.1, 24.9, 25.0, 25.1, 50.0, 99.0, 100.0, 1_000.0, f64::NAN] {
            let level = level_for(avg);
            assert!((MIN_LEVEL..=MAX_LEVEL).contains(&level), "avg {avg} gave {level}");
        }
        assert_eq!(level_for(25.0), 1);
        assert_eq!(level_for(25.1), 2);
        assert_eq!(level_for(1_000.0), MAX_LEVEL);
    }

    #[test]
    fn empty_history_averages_zero() {
        assert_eq!(rolling_average(&[]), 0.0);
    }

    #[test]
    fn weak_areas_merge_and_sort_descending() {
        let existing = vec![
            WeakArea { topic: "supply".to_string(), incorrect_count: 2 },
            WeakArea { topic: "elasticity".to_string(), incorrect_count: 1 },
        ];
        let fresh: BTreeMap<String, u32> =
            [("elasticity".to_string(), 3), ("money".to_string(), 2)].into();

        let merged = merge_weak_areas(&existing, &fresh);
        let pairs: Vec<(&str, u32)> = merged
            .iter()
            .map(|w| (w.topic.as_str(), w.incorrect_count))
            .collect();
        assert_eq!(pairs, vec![("elasticity", 4), ("money", 2), ("supply", 2)]);
    }

    #[test]
    fn weak_area_counts_never_decrease() {
        let mut record = None;
        let rounds: [&[(&str, u32)]; 4] = [
            &[("supply", 2)],
            &[],
            &[("demand", 1)],
            &[("supply", 1), ("demand", 3)],
        ];
        let mut previous: BTreeMap<String, u32> = BTreeMap::new();
        for topics in rounds {
            let next = fold_attempt(record, &identity(), scored(1, 2, topics), chrono::Utc::now());
            for w in &next.weak_areas {
                let before = previous.get(&w.topic).copied().unwrap_or(0);
                assert!(w.incorrect_count >= before);
            }
            for topic in previous.keys() {
                assert!(next.weak_areas.iter().any(|w| &w.topic == topic));
            }
            previous = next
                .weak_areas
                .iter()
                .map(|w| (w.topic.clone(), w.incorrect_count))
                .collect();
            record = Some(next);
        }
        assert_eq!(previous.get("supply"), Some(&3));
        assert_eq!(previous.get("demand"), Some(&4));
    }

    #[test]
    fn existing_record_keeps_identity_and_creation_time() {
        let created = chrono::Utc::now() - chrono::Duration::days(3);
        let existing = LearnerRecord {
            email: "sam@example.com".to_string(),
            name: "Samantha".to_string(),
            level: 7,
            attempts: Vec::new(),
            weak_areas: Vec::new(),
            created_at: created,
            updated_at: created,
        };
        let now = chrono::Utc::now();
        let record = fold_attempt(Some(existing), &identity(), scored(0, 4, &[("t", 4)]), now);
        assert_eq!(record.name, "Samantha");
        assert_eq!(record.created_at, created);
        assert_eq!(record.updated_at, now);
        assert_eq!(record.level, MIN_LEVEL);
    }
}
