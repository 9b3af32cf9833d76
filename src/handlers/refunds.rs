use super::{AppState, JsonBody};
use crate::{
    error::PaystrataError,
    models::{NewRefund, PageQuery, PageRequest, Pagination, Refund, RefundsPage, SuccessResponse},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub async fn list_refunds(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<RefundsPage>, PaystrataError> {
    let page = PageRequest::from(query);
    let (refunds, total) = state.store.list_refunds(page).await?;

    Ok(Json(RefundsPage {
        refunds,
        pagination: Pagination::new(page, total),
    }))
}

pub async fn create_refund(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NewRefund>,
) -> Result<Json<SuccessResponse<Refund>>, PaystrataError> {
    if request.amount <= Decimal::ZERO {
        return Err(PaystrataError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }

    let refund = state.store.create_refund(request).await?;
    tracing::info!(
        refund_id = %refund.id,
        transaction_id = %refund.transaction_id,
        amount = %refund.amount,
        "Refund created"
    );
    Ok(Json(SuccessResponse::new(refund)))
}

pub async fn process_refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<Refund>>, PaystrataError> {
    let refund = state.store.process_refund(id).await?;
    tracing::info!(refund_id = %refund.id, "Refund processed");
    Ok(Json(SuccessResponse::new(refund)))
}
