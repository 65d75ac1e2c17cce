// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, CreateQuestionsPayload, PublicQuestion},
    repository::DynRepository,
};

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// Lists questions without their answer keys.
pub async fn list_questions(
    State(repo): State<DynRepository>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let questions: Vec<PublicQuestion> = repo
        .find_all_questions(limit)
        .await?
        .iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(questions))
}

/// Imports one question or a batch. The whole batch is rejected if any item is invalid.
pub async fn create_questions(
    State(repo): State<DynRepository>,
    Json(payload): Json<CreateQuestionsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let requests: Vec<CreateQuestionRequest> = payload
        .into_vec()
        .into_iter()
        .map(CreateQuestionRequest::sanitized)
        .collect();
    if requests.is_empty() {
        return Err(AppError::BadRequest("No questions supplied".to_string()));
    }

    for (index, request) in requests.iter().enumerate() {
        if let Err(validation_errors) = request.validate() {
            return Err(AppError::BadRequest(format!(
                "Question {}: {}",
                index + 1,
                validation_errors
            )));
        }
    }

    let inserted = repo
        .insert_questions(
            requests
                .into_iter()
                .map(|request| request.into_new_question())
                .collect(),
        )
        .await?;

    tracing::info!("Imported {} question(s)", inserted.len());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "count": inserted.len(),
            "ids": inserted.iter().map(|q| q.id).collect::<Vec<_>>()
        })),
    ))
}
