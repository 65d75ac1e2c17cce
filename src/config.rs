// src/config.rs

use std::env;
use std::str::FromStr;
use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the service keeps everything in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    /// Wall-clock budget of one quiz session.
    pub quiz_duration_secs: u64,
    /// Questions loaded into each session's bank.
    pub question_bank_limit: i64,
    pub reaper_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 86_400),
            rust_log,
            bind_addr,
            quiz_duration_secs: parse_or("QUIZ_DURATION_SECS", 600),
            question_bank_limit: parse_or("QUESTION_BANK_LIMIT", 5),
            reaper_interval_secs: parse_or("REAPER_INTERVAL_SECS", 5),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
