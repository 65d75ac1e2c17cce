// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{engine::difficulty::Difficulty, error::AppError};

/// Question id → selected option text.
pub type AnswerMap = HashMap<i64, String>;

/// Graded outcome of a single question inside an attempt.
/// Keeps a snapshot of the question so it survives later deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerQuestionResult {
    pub question_id: i64,
    pub question_text: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub selected: Option<String>,
    pub is_correct: bool,
    pub marks: i32,
}

/// One completed quiz session. Never edited once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub attempt_id: Uuid,
    pub score: i32,
    pub total: i32,
    pub per_question: Vec<PerQuestionResult>,
    pub attempted_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken_secs: Option<u32>,
}

/// DTO for submitting a quiz that was sequenced by the client.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// Key: Question ID, Value: selected option text.
    pub answers: Option<AnswerMap>,
    /// Question ids in the order they were presented.
    pub question_order: Option<Vec<i64>>,
    pub time_taken_secs: Option<u32>,
}

/// A validated submission, ready for scoring.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub question_order: Vec<i64>,
    pub answers: AnswerMap,
    pub time_taken_secs: Option<u32>,
}

impl TryFrom<SubmitQuizRequest> for Submission {
    type Error = AppError;

    fn try_from(req: SubmitQuizRequest) -> Result<Self, Self::Error> {
        match (req.answers, req.question_order) {
            (Some(answers), Some(question_order)) => Ok(Submission {
                question_order,
                answers,
                time_taken_secs: req.time_taken_secs,
            }),
            _ => Err(AppError::BadRequest("Missing required fields".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_order_is_an_input_error() {
        let req: SubmitQuizRequest =
            serde_json::from_value(serde_json::json!({ "answers": { "1": "a" } })).unwrap();
        assert!(matches!(
            Submission::try_from(req),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn complete_request_converts() {
        let req: SubmitQuizRequest = serde_json::from_value(serde_json::json!({
            "answers": { "1": "a", "2": "b" },
            "question_order": [1, 2],
            "time_taken_secs": 42
        }))
        .unwrap();
        let submission = Submission::try_from(req).unwrap();
        assert_eq!(submission.question_order, vec![1, 2]);
        assert_eq!(submission.answers.get(&2).map(String::as_str), Some("b"));
        assert_eq!(submission.time_taken_secs, Some(42));
    }
}
