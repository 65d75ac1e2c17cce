// src/repository/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        account::{Account, NewAccount},
        learner::LearnerRecord,
        question::{NewQuestion, Question},
    },
    repository::QuizRepository,
};

#[derive(Default)]
struct Store {
    questions: BTreeMap<i64, Question>,
    learners: HashMap<String, LearnerRecord>,
    accounts: HashMap<String, Account>,
    next_question_id: i64,
    next_account_id: i64,
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a question; attempts that reference it keep their snapshot.
    pub async fn remove_question(&self, id: i64) -> bool {
        self.store.write().await.questions.remove(&id).is_some()
    }
}

#[async_trait]
impl QuizRepository for MemoryRepository {
    async fn find_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        let store = self.store.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| store.questions.get(id).cloned())
            .collect())
    }

    async fn find_all_questions(&self, limit: i64) -> Result<Vec<Question>, AppError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let store = self.store.read().await;
        Ok(store.questions.values().take(limit).cloned().collect())
    }

    async fn insert_questions(
        &self,
        questions: Vec<NewQuestion>,
    ) -> Result<Vec<Question>, AppError> {
        let mut store = self.store.write().await;
        let mut inserted = Vec::with_capacity(questions.len());
        for q in questions {
            store.next_question_id += 1;
            let question = Question {
                id: store.next_question_id,
                question_text: q.question_text,
                options: q.options,
                difficulty: q.difficulty,
                topic: q.topic,
                marks: q.marks,
                created_at: Some(chrono::Utc::now()),
            };
            store.questions.insert(question.id, question.clone());
            inserted.push(question);
        }
        Ok(inserted)
    }

    async fn find_learner_by_email(&self, email: &str) -> Result<Option<LearnerRecord>, AppError> {
        Ok(self.store.read().await.learners.get(email).cloned())
    }

    async fn upsert_learner_record(&self, record: &LearnerRecord) -> Result<(), AppError> {
        self.store
            .write()
            .await
            .learners
            .insert(record.email.clone(), record.clone());
        Ok(())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        Ok(self.store.read().await.accounts.get(email).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, AppError> {
        let mut store = self.store.write().await;
        if store.accounts.contains_key(&account.email) {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                account.email
            )));
        }
        store.next_account_id += 1;
        let created = Account {
            id: store.next_account_id,
            email: account.email,
            name: account.name,
            password: account.password_hash,
            created_at: Some(chrono::Utc::now()),
        };
        store.accounts.insert(created.email.clone(), created.clone());
        Ok(created)
    }
}
