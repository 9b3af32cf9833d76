use super::{AppState, JsonBody};
use crate::{
    error::PaystrataError,
    models::{ApiResponse, UtilityPlansRequest},
};
use axum::{extract::State, Json};
use serde_json::Value;

pub async fn stark_price(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, PaystrataError> {
    let price = state.prices.stark_price().await?;
    Ok(Json(ApiResponse::ok(price)))
}

pub async fn utility_plans(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UtilityPlansRequest>,
) -> Result<Json<ApiResponse<Value>>, PaystrataError> {
    if request.provider_code.trim().is_empty() {
        return Err(PaystrataError::Validation("providerCode is required".to_string()));
    }

    let plans = state.biller.utility_plans(request.provider_code.trim()).await?;
    Ok(Json(ApiResponse::ok(plans)))
}
