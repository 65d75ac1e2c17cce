// src/repository/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    FromRow, PgPool, Postgres, QueryBuilder,
    postgres::PgPoolOptions,
    types::Json,
};

use crate::{
    engine::difficulty::Difficulty,
    error::AppError,
    models::{
        account::{Account, NewAccount},
        attempt::Attempt,
        learner::{LearnerRecord, WeakArea},
        question::{NewQuestion, Question, QuestionOption},
    },
    repository::QuizRepository,
};

const QUESTION_COLUMNS: &str = "id, question_text, options, difficulty, topic, marks, created_at";
const CONNECT_RETRIES: u32 = 5;

/// Row shape of the 'questions' table.
#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    question_text: String,
    options: Json<Vec<QuestionOption>>,
    difficulty: String,
    topic: String,
    marks: i32,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let difficulty = row
            .difficulty
            .parse::<Difficulty>()
            .map_err(|e| AppError::InternalServerError(format!("question {}: {}", row.id, e)))?;

        Ok(Question {
            id: row.id,
            question_text: row.question_text,
            options: row.options.0,
            difficulty,
            topic: row.topic,
            marks: row.marks,
            created_at: row.created_at,
        })
    }
}

/// Row shape of the 'learners' table.
#[derive(FromRow)]
struct LearnerRow {
    email: String,
    name: String,
    level: i32,
    attempts: Json<Vec<Attempt>>,
    weak_areas: Json<Vec<WeakArea>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<LearnerRow> for LearnerRecord {
    fn from(row: LearnerRow) -> Self {
        LearnerRecord {
            email: row.email,
            name: row.name,
            level: row.level,
            attempts: row.attempts.0,
            weak_areas: row.weak_areas.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed store.
///
/// The pool is created once at startup and shared; every call borrows a
/// connection only for the duration of its query or transaction.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects, retrying every 2s while the database is still starting.
    pub async fn connect_with_retry(database_url: &str) -> Result<Self, sqlx::Error> {
        let mut retry_count = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => return Ok(Self::new(pool)),
                Err(e) if retry_count < CONNECT_RETRIES => {
                    retry_count += 1;
                    tracing::warn!(
                        "Database not ready ({}), retrying in 2s... (Attempt {})",
                        e,
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl QuizRepository for PostgresRepository {
    async fn find_questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Use QueryBuilder for dynamic IN clause
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM questions WHERE id IN (",
            QUESTION_COLUMNS
        ));
        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<QuestionRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch questions by id: {:?}", e);
                AppError::from(e)
            })?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn find_all_questions(&self, limit: i64) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions ORDER BY RANDOM() LIMIT $1",
            QUESTION_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch question bank: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn insert_questions(
        &self,
        questions: Vec<NewQuestion>,
    ) -> Result<Vec<Question>, AppError> {
        let insert = format!(
            "INSERT INTO questions (question_text, options, difficulty, topic, marks) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            QUESTION_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(questions.len());
        for q in &questions {
            let row = sqlx::query_as::<_, QuestionRow>(&insert)
                .bind(&q.question_text)
                .bind(Json(&q.options))
                .bind(q.difficulty.as_str())
                .bind(&q.topic)
                .bind(q.marks)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to insert question: {:?}", e);
                    AppError::from(e)
                })?;
            inserted.push(Question::try_from(row)?);
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn find_learner_by_email(&self, email: &str) -> Result<Option<LearnerRecord>, AppError> {
        let row = sqlx::query_as::<_, LearnerRow>(
            r#"
            SELECT email, name, level, attempts, weak_areas, created_at, updated_at
            FROM learners
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LearnerRecord::from))
    }

    async fn upsert_learner_record(&self, record: &LearnerRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO learners (email, name, level, attempts, weak_areas, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO UPDATE SET
                name = EXCLUDED.name,
                level = EXCLUDED.level,
                attempts = EXCLUDED.attempts,
                weak_areas = EXCLUDED.weak_areas,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.email)
        .bind(&record.name)
        .bind(record.level)
        .bind(Json(&record.attempts))
        .bind(Json(&record.weak_areas))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert learner {}: {:?}", record.email, e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, name, password, created_at FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::from(e)
        })?;

        Ok(account)
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, AppError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (email, name, password)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password, created_at
            "#,
        )
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let unique_violation = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if unique_violation {
                AppError::Conflict(format!("Email '{}' is already registered", account.email))
            } else {
                tracing::error!("Failed to register account: {:?}", e);
                AppError::from(e)
            }
        })
    }
}
