//! Capital snapshot endpoint: allocated / used / available for one
//! (fund, strategy), resolved against live equity and allocation weight.

use crate::api::AppState;
use crate::domain::{FundId, StrategyId};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CapitalQuery {
    pub fund_id: String,
    pub strategy_id: String,
}

pub async fn get_capital(
    Query(params): Query<CapitalQuery>,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    if params.fund_id.is_empty() || params.strategy_id.is_empty() {
        return Err(AppError::BadRequest(
            "fund_id and strategy_id are required".into(),
        ));
    }

    let snapshot = state
        .orchestrator
        .capital_snapshot(
            &FundId::new(params.fund_id.clone()),
            &StrategyId::new(params.strategy_id.clone()),
        )
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "no active allocation for fund {} and strategy {}",
                params.fund_id, params.strategy_id
            ))
        })?;

    serde_json::to_value(&snapshot)
        .map(Json)
        .map_err(|e| AppError::Internal(e.to_string()))
}
