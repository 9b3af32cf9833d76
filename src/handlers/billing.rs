//! Bill fulfilment. Every route here sits behind the transaction gate and
//! consumes the verified settlement around the biller call.

use super::{AppState, JsonBody};
use crate::{
    error::PaystrataError,
    models::{
        AirtimeRequest, ApiResponse, CableRequest, DataRequest, SettlementKind, UtilityRequest,
        VerifiedTransaction,
    },
};
use axum::{extract::State, Extension, Json};
use serde_json::Value;

pub async fn buy_airtime(
    State(state): State<AppState>,
    Extension(verified): Extension<VerifiedTransaction>,
    JsonBody(request): JsonBody<AirtimeRequest>,
) -> Result<Json<ApiResponse<Value>>, PaystrataError> {
    request.validate()?;

    let data = state
        .settlement
        .fulfil(&verified, state.biller.buy_airtime(&request))
        .await?;

    tracing::info!(
        network = %request.network_code,
        amount = %request.amount,
        "Airtime purchased"
    );
    Ok(Json(ApiResponse::ok(data)))
}

pub async fn buy_data(
    State(state): State<AppState>,
    Extension(verified): Extension<VerifiedTransaction>,
    JsonBody(request): JsonBody<DataRequest>,
) -> Result<Json<ApiResponse<Value>>, PaystrataError> {
    request.validate()?;

    let data = state
        .settlement
        .fulfil(&verified, state.biller.buy_data(&request))
        .await?;

    tracing::info!(network = %request.network_code, plan = %request.data_plan, "Data purchased");
    Ok(Json(ApiResponse::ok(data)))
}

pub async fn pay_cable(
    State(state): State<AppState>,
    Extension(verified): Extension<VerifiedTransaction>,
    JsonBody(request): JsonBody<CableRequest>,
) -> Result<Json<ApiResponse<Value>>, PaystrataError> {
    request.validate()?;

    let data = state
        .settlement
        .fulfil(&verified, state.biller.pay_cable(&request))
        .await?;

    tracing::info!(provider = %request.cable_tv, package = %request.package, "Cable paid");
    Ok(Json(ApiResponse::ok(data)))
}

pub async fn pay_utility(
    State(state): State<AppState>,
    Extension(verified): Extension<VerifiedTransaction>,
    JsonBody(request): JsonBody<UtilityRequest>,
) -> Result<Json<ApiResponse<Value>>, PaystrataError> {
    request.validate()?;

    let data = state
        .settlement
        .fulfil(&verified, state.biller.pay_utility(&request))
        .await
        .map_err(|e| match e {
            // A failed pending settlement is refunded. A completed one is
            // released and can simply be retried.
            PaystrataError::Upstream(msg) if verified.kind == SettlementKind::Pending => {
                PaystrataError::Upstream(format!("{}. You will be refunded", msg))
            }
            other => other,
        })?;

    tracing::info!(company = %request.electric_company_code, "Utility paid");
    Ok(Json(ApiResponse::ok(data)))
}
