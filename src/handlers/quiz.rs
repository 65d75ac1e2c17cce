// src/handlers/quiz.rs

use std::time::Duration;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::Config,
    engine::sequencer::{Sequencer, Step},
    error::AppError,
    models::{
        attempt::{Submission, SubmitQuizRequest},
        question::Question,
    },
    repository::DynRepository,
    services::{
        sessions::{Access, QuizSession, SessionStore, SessionView, submit_or_restore},
        submission::{SubmissionOutcome, submit},
    },
    utils::jwt::Claims,
};

/// Body of every quiz session response, tagged by `status`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuizStep {
    InProgress(SessionView),
    /// Nothing left to draw, so the session was submitted.
    Exhausted(SubmissionOutcome),
    NoQuestionsAvailable,
    Submitted(SubmissionOutcome),
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub option: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdvanceRequest {
    /// Optional last-moment selection for the current question.
    pub option: Option<String>,
}

/// Turns a session access into a response, auto-submitting sessions that ran out of time.
async fn resolve(
    repo: &DynRepository,
    sessions: &SessionStore,
    access: Access<QuizStep>,
) -> Result<Json<QuizStep>, AppError> {
    match access {
        Access::Live(step) => Ok(Json(step)),
        Access::Expired(session) => {
            tracing::info!("Session {} expired, submitting", session.id);
            let outcome = submit_or_restore(repo, sessions, session).await?;
            Ok(Json(QuizStep::Submitted(outcome)))
        }
    }
}

/// Starts an adaptive session over a freshly loaded question bank.
pub async fn start_session(
    State(repo): State<DynRepository>,
    State(sessions): State<SessionStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let bank: Vec<Question> = repo
        .find_all_questions(config.question_bank_limit)
        .await?
        .into_iter()
        .filter(Question::is_playable)
        .collect();

    let started = {
        let mut rng = rand::rng();
        Sequencer::start(bank, &mut rng)
    };
    let Ok(sequencer) = started else {
        tracing::warn!("No questions available for {}", claims.sub);
        return Ok((StatusCode::OK, Json(QuizStep::NoQuestionsAvailable)));
    };

    let now = Utc::now();
    let session = QuizSession::new(
        claims.identity(),
        sequencer,
        now,
        Duration::from_secs(config.quiz_duration_secs),
    );
    let view = session.view(now);
    tracing::info!("Session {} started for {}", session.id, claims.sub);
    sessions.insert(session);

    Ok((StatusCode::CREATED, Json(QuizStep::InProgress(view))))
}

pub async fn get_session(
    State(repo): State<DynRepository>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let access = sessions.access(id, &claims.sub, now, |session| {
        Ok(QuizStep::InProgress(session.view(now)))
    })?;
    resolve(&repo, &sessions, access).await
}

/// Records the selected option for the question on screen.
pub async fn answer(
    State(repo): State<DynRepository>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let access = sessions.access(id, &claims.sub, now, |session| {
        session.sequencer.select(payload.option)?;
        Ok(QuizStep::InProgress(session.view(now)))
    })?;
    resolve(&repo, &sessions, access).await
}

/// Grades the current question and moves to the next one, drawing if needed.
pub async fn advance(
    State(repo): State<DynRepository>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // The body is optional when an option was already selected.
    let option = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<AdvanceRequest>(&body)?.option
    };
    let now = Utc::now();
    let access = sessions.access(id, &claims.sub, now, |session| {
        let mut rng = rand::rng();
        let exhausted = matches!(session.sequencer.advance(option, &mut rng)?, Step::Exhausted);
        Ok((!exhausted).then(|| QuizStep::InProgress(session.view(now))))
    })?;

    let access = match access {
        Access::Live(Some(step)) => Access::Live(step),
        Access::Live(None) => {
            // Exhausted: the session ends here.
            let session = sessions.take(id, &claims.sub)?;
            tracing::info!("Session {} exhausted the bank, submitting", id);
            let outcome = submit_or_restore(&repo, &sessions, session).await?;
            return Ok(Json(QuizStep::Exhausted(outcome)));
        }
        Access::Expired(session) => Access::Expired(session),
    };
    resolve(&repo, &sessions, access).await
}

pub async fn back(
    State(repo): State<DynRepository>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let access = sessions.access(id, &claims.sub, now, |session| {
        session.sequencer.back();
        Ok(QuizStep::InProgress(session.view(now)))
    })?;
    resolve(&repo, &sessions, access).await
}

/// Ends the session and records the attempt.
///
/// The session is put back if persisting fails so the learner can retry.
pub async fn finish_session(
    State(repo): State<DynRepository>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.take(id, &claims.sub)?;
    let outcome = submit_or_restore(&repo, &sessions, session).await?;
    Ok(Json(QuizStep::Submitted(outcome)))
}

/// Drops the session without recording anything.
///
/// A session whose time is already up is submitted instead.
pub async fn abandon(
    State(repo): State<DynRepository>,
    State(sessions): State<SessionStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = sessions.take(id, &claims.sub)?;

    if session.is_expired(Utc::now()) {
        tracing::info!("Session {} expired before it was abandoned, submitting", id);
        let outcome = submit_or_restore(&repo, &sessions, session).await?;
        return Ok(Json(QuizStep::Submitted(outcome)).into_response());
    }

    tracing::info!("Session {} abandoned by {}", id, claims.sub);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Scores a quiz sequenced by the client.
pub async fn submit_quiz(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = Submission::try_from(payload)?;
    let outcome = submit(repo.as_ref(), &claims.identity(), submission).await?;
    Ok(Json(outcome))
}
