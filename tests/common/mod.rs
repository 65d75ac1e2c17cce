// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use adaptive_quiz::{
    config::Config,
    engine::difficulty::Difficulty,
    models::question::{NewQuestion, Question, QuestionOption},
    repository::{DynRepository, MemoryRepository, QuizRepository},
    routes,
    state::AppState,
};

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepository>,
    pub client: reqwest::Client,
}

pub fn test_config(quiz_duration_secs: u64) -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        quiz_duration_secs,
        question_bank_limit: 5,
        reaper_interval_secs: 3600,
    }
}

/// Spawns the app on a random port, backed by an in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(600)).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    spawn_app_on(config, repo.clone(), repo).await
}

/// `repo` serves the requests; `memory` is kept for seeding and inspection.
pub async fn spawn_app_on(
    config: Config,
    memory: Arc<MemoryRepository>,
    repo: DynRepository,
) -> TestApp {
    let state = AppState::new(repo, config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        repo: memory,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers an account and returns a bearer token for it.
    pub async fn login_as(&self, email: &str) -> String {
        let register = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "name": "Test Learner",
                "password": "password123"
            }))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(register.status().as_u16(), 201);

        let login = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({
                "email": email,
                "password": "password123"
            }))
            .send()
            .await
            .expect("Failed to login");
        assert_eq!(login.status().as_u16(), 200);

        let body: serde_json::Value = login.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// One question per difficulty, answer "right", inserted medium, easy, hard.
    pub async fn seed_one_per_difficulty(&self) -> Vec<Question> {
        self.repo
            .insert_questions(vec![
                question("algebra", Difficulty::Medium),
                question("geometry", Difficulty::Easy),
                question("calculus", Difficulty::Hard),
            ])
            .await
            .unwrap()
    }
}

pub fn question(topic: &str, difficulty: Difficulty) -> NewQuestion {
    NewQuestion {
        question_text: format!("A {} {} question", difficulty, topic),
        options: vec![
            QuestionOption { text: "right".to_string(), is_correct: true },
            QuestionOption { text: "wrong".to_string(), is_correct: false },
        ],
        difficulty,
        topic: topic.to_string(),
        marks: 1,
    }
}
