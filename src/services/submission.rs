// src/services/submission.rs

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use crate::{
    engine::{
        leveling,
        scoring::{self, SessionSummary},
    },
    error::AppError,
    models::{
        attempt::{Attempt, Submission},
        learner::{LearnerIdentity, LearnerSummary},
        question::Question,
    },
    repository::QuizRepository,
};

/// Everything returned to the learner after a quiz is submitted.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub attempt: Attempt,
    pub learner: LearnerSummary,
    pub summary: SessionSummary,
}

/// Scores a submission and folds it into the learner's record.
///
/// Referenced questions are fetched once; ids that no longer exist are scored
/// as placeholders. The record is written back in a single upsert.
pub async fn submit(
    repo: &dyn QuizRepository,
    identity: &LearnerIdentity,
    submission: Submission,
) -> Result<SubmissionOutcome, AppError> {
    let mut ids = submission.question_order.clone();
    ids.sort_unstable();
    ids.dedup();

    let questions: HashMap<i64, Question> = repo
        .find_questions_by_ids(&ids)
        .await?
        .into_iter()
        .map(|q| (q.id, q))
        .collect();

    let now = Utc::now();
    let scored = scoring::score_attempt(
        &submission.question_order,
        &submission.answers,
        &questions,
        now,
        submission.time_taken_secs,
    );
    let attempt = scored.attempt.clone();
    let summary = scoring::summarize(&attempt, &questions);

    let existing = repo.find_learner_by_email(&identity.email).await?;
    let record = leveling::fold_attempt(existing, identity, scored, now);
    repo.upsert_learner_record(&record).await?;

    tracing::info!(
        "Quiz submitted by {}: {}/{} (level {})",
        record.email,
        attempt.score,
        attempt.total,
        record.level
    );

    Ok(SubmissionOutcome {
        attempt,
        learner: LearnerSummary::from(&record),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::difficulty::Difficulty,
        models::question::{NewQuestion, QuestionOption},
        repository::MemoryRepository,
    };

    fn new_question(topic: &str, difficulty: Difficulty) -> NewQuestion {
        NewQuestion {
            question_text: format!("{topic} question"),
            options: vec![
                QuestionOption { text: "right".to_string(), is_correct: true },
                QuestionOption { text: "wrong".to_string(), is_correct: false },
            ],
            difficulty,
            topic: topic.to_string(),
            marks: 1,
        }
    }

    fn identity() -> LearnerIdentity {
        LearnerIdentity {
            email: "sam@example.com".to_string(),
            name: Some("Sam".to_string()),
        }
    }

    #[tokio::test]
    async fn submission_creates_and_updates_learner() {
        let repo = MemoryRepository::new();
        let qs = repo
            .insert_questions(vec![
                new_question("algebra", Difficulty::Medium),
                new_question("geometry", Difficulty::Easy),
                new_question("algebra", Difficulty::Hard),
                new_question("calculus", Difficulty::Hard),
            ])
            .await
            .unwrap();

        let submission = Submission {
            question_order: qs.iter().map(|q| q.id).collect(),
            answers: HashMap::from([
                (qs[0].id, "right".to_string()),
                (qs[1].id, "right".to_string()),
                (qs[2].id, "right".to_string()),
                (qs[3].id, "wrong".to_string()),
            ]),
            time_taken_secs: Some(90),
        };

        let outcome = submit(&repo, &identity(), submission).await.unwrap();
        assert_eq!(outcome.attempt.score, 3);
        assert_eq!(outcome.attempt.total, 4);
        assert_eq!(outcome.learner.level, 3);
        assert_eq!(outcome.learner.attempts, 1);
        assert_eq!(outcome.learner.weak_areas.len(), 1);
        assert_eq!(outcome.learner.weak_areas[0].topic, "calculus");
        assert_eq!(outcome.summary.accuracy, 75);

        let stored = repo
            .find_learner_by_email("sam@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "Sam");
        assert_eq!(stored.attempts.len(), 1);
    }

    #[tokio::test]
    async fn deleted_questions_score_as_placeholders() {
        let repo = MemoryRepository::new();
        let qs = repo
            .insert_questions(vec![
                new_question("algebra", Difficulty::Medium),
                new_question("geometry", Difficulty::Easy),
            ])
            .await
            .unwrap();
        assert!(repo.remove_question(qs[1].id).await);

        let submission = Submission {
            question_order: vec![qs[0].id, qs[1].id],
            answers: HashMap::from([
                (qs[0].id, "right".to_string()),
                (qs[1].id, "right".to_string()),
            ]),
            time_taken_secs: None,
        };

        let outcome = submit(&repo, &identity(), submission).await.unwrap();
        assert_eq!(outcome.attempt.score, 1);
        assert_eq!(outcome.attempt.total, 1);
        let missing = &outcome.attempt.per_question[1];
        assert!(!missing.is_correct);
        assert_eq!(missing.topic, scoring::UNKNOWN_TOPIC);
        assert_eq!(missing.question_text, scoring::DELETED_QUESTION_TEXT);
    }
}
