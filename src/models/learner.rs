// src/models/learner.rs

use serde::{Deserialize, Serialize};

use crate::models::attempt::Attempt;

/// Cumulative incorrect answers for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakArea {
    pub topic: String,
    pub incorrect_count: u32,
}

/// Represents the 'learners' table in the database.
/// History and weak areas are stored alongside the learner and replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerRecord {
    pub email: String,
    pub name: String,
    /// Proficiency level in `1..=10`.
    pub level: i32,
    pub attempts: Vec<Attempt>,
    /// Sorted by descending incorrect count.
    pub weak_areas: Vec<WeakArea>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Compact view returned after a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerSummary {
    pub email: String,
    pub name: String,
    pub level: i32,
    pub attempts: usize,
    pub weak_areas: Vec<WeakArea>,
}

impl From<&LearnerRecord> for LearnerSummary {
    fn from(record: &LearnerRecord) -> Self {
        Self {
            email: record.email.clone(),
            name: record.name.clone(),
            level: record.level,
            attempts: record.attempts.len(),
            weak_areas: record.weak_areas.clone(),
        }
    }
}

/// Identity supplied by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerIdentity {
    pub email: String,
    pub name: Option<String>,
}

impl LearnerIdentity {
    /// Supplied name, or the local part of the email.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or(self.email.as_str())
                .to_string(),
        }
    }
}
