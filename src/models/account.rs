// src/models/account.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'accounts' table in the database (login credentials).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,

    /// Unique login, also the learner identifier.
    pub email: String,

    pub name: Option<String>,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Credentials ready to be stored (password already hashed).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// DTO for creating a new account (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(max = 80, message = "Name must be at most 80 characters."))]
    pub name: Option<String>,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
