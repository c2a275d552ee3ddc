//! Liveness and readiness probes. `/ready` answers 200 only while the
//! decision store is reachable.

use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn ready(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state
        .repo
        .ping()
        .await
        .map_err(|e| AppError::Internal(format!("decision store unreachable: {}", e)))?;
    Ok(Json(json!({"status": "ready"})))
}
