// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, learner, questions, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * `/api/auth` is public; everything else requires a bearer token.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let question_routes = Router::new().route(
        "/",
        get(questions::list_questions).post(questions::create_questions),
    );

    let quiz_routes = Router::new()
        .route("/sessions", post(quiz::start_session))
        .route(
            "/sessions/{id}",
            get(quiz::get_session).delete(quiz::abandon),
        )
        .route("/sessions/{id}/answer", put(quiz::answer))
        .route("/sessions/{id}/advance", post(quiz::advance))
        .route("/sessions/{id}/back", post(quiz::back))
        .route("/sessions/{id}/submit", post(quiz::finish_session))
        .route("/submit", post(quiz::submit_quiz));

    let learner_routes = Router::new()
        .route("/me", get(learner::get_me))
        .route("/me/progress", get(learner::get_progress));

    let protected = Router::new()
        .nest("/api/questions", question_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/learners", learner_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(protected)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
