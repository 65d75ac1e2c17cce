// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{engine::difficulty::Difficulty, utils::html::clean_html};

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    pub is_correct: bool,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub question_text: String,

    /// Ordered options. Exactly one should be flagged correct; this is not enforced.
    pub options: Vec<QuestionOption>,

    pub difficulty: Difficulty,

    /// Topic label used for weak-area tracking.
    pub topic: String,

    /// Marks awarded for a correct answer.
    pub marks: i32,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    /// The first option flagged correct, if any.
    pub fn correct_option(&self) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.is_correct)
    }

    pub fn has_option(&self, text: &str) -> bool {
        self.options.iter().any(|o| o.text == text)
    }

    /// A question can be served only with some text and at least two options.
    pub fn is_playable(&self) -> bool {
        !self.question_text.trim().is_empty() && self.options.len() >= 2
    }
}

/// DTO for sending a question to the client (hides which option is correct).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    pub topic: String,
    pub marks: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            options: q.options.iter().map(|o| o.text.clone()).collect(),
            difficulty: q.difficulty,
            topic: q.topic.clone(),
            marks: q.marks,
        }
    }
}

/// A sanitized question ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub options: Vec<QuestionOption>,
    pub difficulty: Difficulty,
    pub topic: String,
    pub marks: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOptionRequest {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<CreateOptionRequest>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[serde(default = "default_marks")]
    #[validate(range(min = 1, max = 100))]
    pub marks: i32,
}

/// Import body: a single question or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateQuestionsPayload {
    Many(Vec<CreateQuestionRequest>),
    One(CreateQuestionRequest),
}

impl CreateQuestionsPayload {
    pub fn into_vec(self) -> Vec<CreateQuestionRequest> {
        match self {
            CreateQuestionsPayload::Many(list) => list,
            CreateQuestionsPayload::One(q) => vec![q],
        }
    }
}

impl CreateQuestionRequest {
    /// Strips markup from every free-text field. Validate the result, not the raw input.
    pub fn sanitized(self) -> Self {
        Self {
            question_text: clean_html(&self.question_text),
            options: self
                .options
                .into_iter()
                .map(|o| CreateOptionRequest {
                    text: clean_html(&o.text),
                    is_correct: o.is_correct,
                })
                .collect(),
            topic: clean_html(&self.topic),
            ..self
        }
    }

    /// Expects a request that went through `sanitized`.
    pub fn into_new_question(self) -> NewQuestion {
        NewQuestion {
            question_text: self.question_text,
            options: self
                .options
                .into_iter()
                .map(|o| QuestionOption {
                    text: o.text,
                    is_correct: o.is_correct,
                })
                .collect(),
            difficulty: self.difficulty,
            topic: self.topic,
            marks: self.marks,
        }
    }
}

fn default_marks() -> i32 {
    1
}

fn validate_options(options: &[CreateOptionRequest]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.text.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
