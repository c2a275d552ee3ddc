//! Signal intake endpoint: hands the signal to the orchestrator and
//! returns the committed decision.

use crate::api::AppState;
use crate::domain::Signal;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde_json::Value;

pub async fn post_signal(
    State(state): State<AppState>,
    Json(signal): Json<Signal>,
) -> Result<Json<Value>, AppError> {
    let decision = state.orchestrator.process_signal(&signal).await?;
    serde_json::to_value(&decision)
        .map(Json)
        .map_err(|e| AppError::Internal(e.to_string()))
}
