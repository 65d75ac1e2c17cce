// src/handlers/learner.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;

use crate::{
    engine::progress::summarize_progress,
    error::AppError,
    models::learner::LearnerRecord,
    repository::DynRepository,
    utils::jwt::Claims,
};

async fn load_record(repo: &DynRepository, email: &str) -> Result<LearnerRecord, AppError> {
    repo.find_learner_by_email(email)
        .await?
        .ok_or(AppError::NotFound("No quiz attempts recorded yet".to_string()))
}

/// Full learner record: level, attempt history and weak areas.
pub async fn get_me(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let record = load_record(&repo, &claims.sub).await?;
    Ok(Json(record))
}

/// Dashboard numbers derived from the learner record.
pub async fn get_progress(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let record = load_record(&repo, &claims.sub).await?;
    Ok(Json(summarize_progress(&record, Utc::now().date_naive())))
}
