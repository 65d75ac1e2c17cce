// src/engine/progress.rs

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    engine::leveling::{LEVEL_BAND, attempt_percentage, rolling_average},
    models::learner::{LearnerRecord, WeakArea},
};

/// Weak areas shown on the dashboard.
pub const TOP_WEAK_AREAS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicAccuracy {
    pub topic: String,
    pub correct: u32,
    pub total: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub attempt_index: usize,
    pub date: NaiveDate,
    pub percentage: u32,
}

/// Dashboard view of a learner's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerProgress {
    pub email: String,
    pub name: String,
    pub level: i32,
    pub rolling_average: f64,
    /// How far through the current level band the rolling average is, 0-100.
    pub progress_to_next_level: f64,
    pub latest_score: u32,
    pub attempts: usize,
    pub questions_answered: usize,
    /// Consecutive days, ending `today`, with at least one attempt.
    pub day_streak: u32,
    pub weak_areas: Vec<WeakArea>,
    pub topics: Vec<TopicAccuracy>,
    pub trend: Vec<TrendPoint>,
}

pub fn summarize_progress(record: &LearnerRecord, today: NaiveDate) -> LearnerProgress {
    let average = rolling_average(&record.attempts);

    let mut topics: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for pq in record.attempts.iter().flat_map(|a| &a.per_question) {
        let entry = topics.entry(pq.topic.as_str()).or_insert((0, 0));
        entry.1 += 1;
        if pq.is_correct {
            entry.0 += 1;
        }
    }

    LearnerProgress {
        email: record.email.clone(),
        name: record.name.clone(),
        level: record.level,
        rolling_average: average,
        progress_to_next_level: ((average % LEVEL_BAND) * (100.0 / LEVEL_BAND)).clamp(0.0, 100.0),
        latest_score: record
            .attempts
            .last()
            .map_or(0, |a| attempt_percentage(a).round() as u32),
        attempts: record.attempts.len(),
        questions_answered: record.attempts.iter().map(|a| a.per_question.len()).sum(),
        day_streak: day_streak(record, today),
        weak_areas: record
            .weak_areas
            .iter()
            .take(TOP_WEAK_AREAS)
            .cloned()
            .collect(),
        topics: topics
            .into_iter()
            .map(|(topic, (correct, total))| TopicAccuracy {
                topic: topic.to_string(),
                correct,
                total,
                percentage: (f64::from(correct) * 100.0 / f64::from(total)).round() as u32,
            })
            .collect(),
        trend: record
            .attempts
            .iter()
            .enumerate()
            .map(|(i, a)| TrendPoint {
                attempt_index: i + 1,
                date: a.attempted_at.date_naive(),
                percentage: attempt_percentage(a).round() as u32,
            })
            .collect(),
    }
}

fn day_streak(record: &LearnerRecord, today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = record
        .attempts
        .iter()
        .map(|a| a.attempted_at.date_naive())
        .collect();

    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}
