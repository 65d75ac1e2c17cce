// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::account::{CreateAccountRequest, LoginRequest, NewAccount},
    repository::DynRepository,
    utils::{
        hash::{hash_password, verify_password},
        html::clean_html,
        jwt::sign_jwt,
    },
};

/// Registers a new account.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the account object (excluding password).
pub async fn register(
    State(repo): State<DynRepository>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let account = repo
        .insert_account(NewAccount {
            email: payload.email.trim().to_lowercase(),
            name: payload
                .name
                .as_deref()
                .map(clean_html)
                .filter(|name| !name.is_empty()),
            password_hash: hashed_password,
        })
        .await?;

    tracing::info!("Registered account {}", account.email);

    Ok((StatusCode::CREATED, Json(account)))
}

/// Authenticates an account and returns a JWT token.
///
/// The token subject is the email, which is also the learner identifier.
pub async fn login(
    State(repo): State<DynRepository>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let account = repo
        .find_account_by_email(&email)
        .await?
        .ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    let is_valid = verify_password(&payload.password, &account.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let token = sign_jwt(
        &account.email,
        account.name.as_deref(),
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer"
    })))
}
