//! Decision read endpoint.

use crate::api::AppState;
use crate::domain::SignalId;
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

pub async fn get_decision(
    Path(signal_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let decision = state
        .repo
        .get_decision(&SignalId::new(signal_id.clone()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no decision for signal {}", signal_id)))?;
    serde_json::to_value(&decision)
        .map(Json)
        .map_err(|e| AppError::Internal(e.to_string()))
}
