pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    ai_service::{AIService, QuestionGenerator},
    quiz_service::QuizService,
    session_service::SessionStore,
};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub quiz_service: QuizService,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.generation_timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let ai_service = AIService::new(
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
            config.llm_temperature,
            config.generation_timeout(),
            http_client,
        );

        Ok(Self::with_generator(Arc::new(ai_service), config))
    }

    pub fn with_generator(generator: Arc<dyn QuestionGenerator>, config: &Config) -> Self {
        Self {
            sessions: SessionStore::new(),
            quiz_service: QuizService::new(
                generator,
                config.llm_model.clone(),
                config.generation_timeout(),
            ),
        }
    }
}

/// All routes, rate limited, without the outer CORS/trace layers.
pub fn build_router(state: AppState, public_rps: u32) -> Router {
    let quiz_api = Router::new()
        .route("/api/quizzes", post(routes::quiz::create_quiz))
        .route(
            "/api/quizzes/:id",
            get(routes::quiz::get_quiz).delete(routes::quiz::delete_quiz),
        )
        .route(
            "/api/quizzes/:id/questions",
            post(routes::quiz::next_question),
        )
        .route("/api/quizzes/:id/answers", post(routes::quiz::submit_answer))
        .route("/api/quizzes/:id/finish", post(routes::quiz::finish_quiz))
        .route("/api/quizzes/:id/summary", get(routes::quiz::get_summary))
        .layer(axum::middleware::from_fn_with_state(
            middleware::rate_limit::new_rps_state(public_rps),
            middleware::rate_limit::rps_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(quiz_api)
        .with_state(state)
}
