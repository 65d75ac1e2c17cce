// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use adaptive_quiz::config::Config;
use adaptive_quiz::repository::{DynRepository, MemoryRepository, PostgresRepository};
use adaptive_quiz::routes;
use adaptive_quiz::services::sessions::spawn_reaper;
use adaptive_quiz::state::AppState;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let repo: DynRepository = match &config.database_url {
        Some(url) => {
            let repo = PostgresRepository::connect_with_retry(url).await?;
            tracing::info!("Database connected...");

            // Run Migrations Automatically
            tracing::info!("Running migrations...");
            repo.migrate().await?;
            tracing::info!("Migrations applied successfully.");
            Arc::new(repo)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping all data in memory");
            Arc::new(MemoryRepository::new())
        }
    };

    let state = AppState::new(repo, config.clone());

    // Auto-submit sessions whose time budget ran out
    spawn_reaper(
        state.repo.clone(),
        state.sessions.clone(),
        Duration::from_secs(config.reaper_interval_secs),
    );

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}
