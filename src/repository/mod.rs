// src/repository/mod.rs

//! Persistence collaborators. Handlers and services only see `QuizRepository`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        account::{Account, NewAccount},
        learner::LearnerRecord,
        question::{NewQuestion, Question},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Shared handle stored in `AppState`.
pub type DynRepository = Arc<dyn QuizRepository>;

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Unknown ids are silently skipped.
    async fn find_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError>;

    /// Bootstrap bank for a session.
    async fn find_all_questions(&self, limit: i64) -> Result<Vec<Question>, AppError>;

    async fn insert_questions(&self, questions: Vec<NewQuestion>)
    -> Result<Vec<Question>, AppError>;

    async fn find_learner_by_email(&self, email: &str) -> Result<Option<LearnerRecord>, AppError>;

    /// Replaces the stored record wholesale (last write wins).
    async fn upsert_learner_record(&self, record: &LearnerRecord) -> Result<(), AppError>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    /// `AppError::Conflict` when the email is taken.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, AppError>;
}
