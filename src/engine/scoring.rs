// src/engine/scoring.rs

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    engine::difficulty::Difficulty,
    models::{
        attempt::{AnswerMap, Attempt, PerQuestionResult},
        question::Question,
    },
};

/// Topic recorded for a question that no longer exists.
pub const UNKNOWN_TOPIC: &str = "unknown";
pub const DELETED_QUESTION_TEXT: &str = "Deleted question";

/// Exact text match against the first option flagged correct.
/// Unanswered is always incorrect.
pub fn grade(question: &Question, selected: Option<&str>) -> bool {
    match (question.correct_option(), selected) {
        (Some(correct), Some(selected)) => correct.text == selected,
        _ => false,
    }
}

pub fn marks_awarded(question: &Question, selected: Option<&str>) -> i32 {
    if grade(question, selected) {
        question.marks
    } else {
        0
    }
}

/// Scoring output: the attempt plus incorrect answers per topic.
#[derive(Debug, Clone)]
pub struct ScoredAttempt {
    pub attempt: Attempt,
    pub topic_incorrect: BTreeMap<String, u32>,
}

/// Grades `order` against `questions`.
///
/// Ids missing from `questions` are scored as incorrect placeholders and add
/// nothing to the total. Repeated ids are scored once.
pub fn score_attempt(
    order: &[i64],
    answers: &AnswerMap,
    questions: &HashMap<i64, Question>,
    attempted_at: chrono::DateTime<chrono::Utc>,
    time_taken_secs: Option<u32>,
) -> ScoredAttempt {
    let mut seen = HashSet::new();
    let mut total = 0;
    let mut per_question = Vec::with_capacity(order.len());

    for &qid in order {
        if !seen.insert(qid) {
            continue;
        }
        let selected = answers.get(&qid).cloned();
        let result = match questions.get(&qid) {
            Some(q) => {
                total += q.marks;
                let is_correct = grade(q, selected.as_deref());
                PerQuestionResult {
                    question_id: qid,
                    question_text: q.question_text.clone(),
                    topic: q.topic.clone(),
                    difficulty: q.difficulty,
                    selected,
                    is_correct,
                    marks: if is_correct { q.marks } else { 0 },
                }
            }
            None => {
                tracing::warn!("Question {} no longer exists, scoring as incorrect", qid);
                PerQuestionResult {
                    question_id: qid,
                    question_text: DELETED_QUESTION_TEXT.to_string(),
                    topic: UNKNOWN_TOPIC.to_string(),
                    difficulty: Difficulty::Medium,
                    selected,
                    is_correct: false,
                    marks: 0,
                }
            }
        };
        per_question.push(result);
    }

    let score = per_question.iter().map(|r| r.marks).sum();
    let topic_incorrect = topic_incorrect_counts(&per_question);

    ScoredAttempt {
        attempt: Attempt {
            attempt_id: Uuid::new_v4(),
            score,
            total,
            per_question,
            attempted_at,
            time_taken_secs,
        },
        topic_incorrect,
    }
}

pub fn topic_incorrect_counts(results: &[PerQuestionResult]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for r in results.iter().filter(|r| !r.is_correct) {
        *counts.entry(r.topic.clone()).or_insert(0) += 1;
    }
    counts
}

/// Share of correct answers, rounded to the nearest integer. Display only.
pub fn accuracy_percent(results: &[PerQuestionResult]) -> u32 {
    if results.is_empty() {
        return 0;
    }
    let correct = results.iter().filter(|r| r.is_correct).count();
    (correct as f64 * 100.0 / results.len() as f64).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicBreakdown {
    pub topic: String,
    pub questions: u32,
    pub correct: u32,
    pub marks: i32,
    pub marks_scored: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewItem {
    pub question_id: i64,
    pub question_text: String,
    pub difficulty: Difficulty,
    pub selected: Option<String>,
    pub is_correct: bool,
    pub correct_answer: Option<String>,
}

/// What the learner sees after submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub score: i32,
    pub total: i32,
    pub accuracy: u32,
    pub topics: Vec<TopicBreakdown>,
    pub review: Vec<ReviewItem>,
}

pub fn summarize(attempt: &Attempt, questions: &HashMap<i64, Question>) -> SessionSummary {
    let mut topics: BTreeMap<&str, TopicBreakdown> = BTreeMap::new();
    let mut review = Vec::with_capacity(attempt.per_question.len());

    for r in &attempt.per_question {
        let question = questions.get(&r.question_id);
        let entry = topics.entry(r.topic.as_str()).or_insert_with(|| TopicBreakdown {
            topic: r.topic.clone(),
            questions: 0,
            correct: 0,
            marks: 0,
            marks_scored: 0,
        });
        entry.questions += 1;
        entry.marks += question.map_or(0, |q| q.marks);
        if r.is_correct {
            entry.correct += 1;
            entry.marks_scored += r.marks;
        }

        review.push(ReviewItem {
            question_id: r.question_id,
            question_text: r.question_text.clone(),
            difficulty: r.difficulty,
            selected: r.selected.clone(),
            is_correct: r.is_correct,
            correct_answer: question
                .and_then(Question::correct_option)
                .map(|o| o.text.clone()),
        });
    }

    SessionSummary {
        score: attempt.score,
        total: attempt.total,
        accuracy: accuracy_percent(&attempt.per_question),
        topics: topics.into_values().collect(),
        review,
    }
}
