pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::database::{
    pg_store::PgStore,
    store::{QuestionStore, ResultStore, SubmissionStore},
};
use crate::error::{Error, Result};
use crate::services::{
    ai_service::{AIService, FeedbackGenerator},
    feedback_service::FeedbackService,
    question_service::QuestionService,
    result_service::ResultService,
};
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub result_service: ResultService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let generator = AIService::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            http_client,
            Duration::from_secs(config.feedback_timeout_secs),
        );
        let store = Arc::new(PgStore::new(pool));

        Ok(Self::with_stores(
            store.clone(),
            store.clone(),
            store,
            Arc::new(generator),
        ))
    }

    /// Wires the pipeline over arbitrary store and generator implementations.
    pub fn with_stores(
        questions: Arc<dyn QuestionStore>,
        submissions: Arc<dyn SubmissionStore>,
        results: Arc<dyn ResultStore>,
        generator: Arc<dyn FeedbackGenerator>,
    ) -> Self {
        let config = crate::config::get_config();
        let feedback = FeedbackService::new(
            generator,
            Duration::from_secs(config.feedback_timeout_secs),
            config.max_feedback_questions,
        );
        let result_service = ResultService::new(
            QuestionService::new(questions),
            submissions,
            results,
            feedback,
            config.batch_concurrency,
        );
        Self { result_service }
    }
}

/// Health is public; everything under `/api/integration` needs a bearer
/// token and shares one rate limiter.
pub fn router(state: AppState) -> Router {
    let config = crate::config::get_config();

    let integration_api = Router::new()
        .route(
            "/api/integration/companies/:company_id/interviews/:interview_id/candidates/:candidate_id/score",
            post(routes::results::score_candidate),
        )
        .route(
            "/api/integration/companies/:company_id/interviews/:interview_id/candidates/:candidate_id/report",
            get(routes::results::get_candidate_report),
        )
        .route(
            "/api/integration/companies/:company_id/interviews/:interview_id/results",
            get(routes::results::list_interview_results),
        )
        .route_layer(axum::middleware::from_fn(
            crate::middleware::auth::require_bearer_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            crate::middleware::rate_limit::RateLimiter::new(config.integration_rps),
            crate::middleware::rate_limit::rps_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(integration_api)
        .with_state(state)
}
