pub mod capital;
pub mod decisions;
pub mod health;
pub mod signals;

use crate::db::Repository;
use crate::orchestration::DecisionOrchestrator;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub orchestrator: Arc<DecisionOrchestrator>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, orchestrator: Arc<DecisionOrchestrator>) -> Self {
        Self { repo, orchestrator }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/signals", post(signals::post_signal))
        .route("/v1/decisions/:signal_id", get(decisions::get_decision))
        .route("/v1/capital", get(capital::get_capital))
        .layer(cors)
        .with_state(state)
}
