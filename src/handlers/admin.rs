use super::{AppState, JsonBody};
use crate::{
    error::PaystrataError,
    models::{
        Analytics, LoginRequest, LoginResponse, PageQuery, PageRequest, Pagination,
        PendingTransactionsPage, RecentActivity, SuccessResponse, SwapsPage, Transaction,
        TransactionsPage,
    },
};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

pub async fn admin_login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, PaystrataError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(PaystrataError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let response = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(response))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<TransactionsPage>, PaystrataError> {
    let page = PageRequest::from(query);
    let (transactions, total) = state.store.list_transactions(page).await?;

    Ok(Json(TransactionsPage {
        transactions,
        pagination: Pagination::new(page, total),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub reference: Option<String>,
    pub wallet_address: Option<String>,
}

pub async fn search_transactions(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SuccessResponse<Vec<Transaction>>>, PaystrataError> {
    let reference = query.reference.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let wallet = query
        .wallet_address
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if reference.is_none() && wallet.is_none() {
        return Err(PaystrataError::Validation(
            "Reference or wallet address is required".to_string(),
        ));
    }

    let transactions = state.store.search_transactions(reference, wallet).await?;
    Ok(Json(SuccessResponse::new(transactions)))
}

pub async fn list_pending_transactions(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PendingTransactionsPage>, PaystrataError> {
    let page = PageRequest::from(query);
    let (pending_transactions, total) = state.store.list_pending(page).await?;

    Ok(Json(PendingTransactionsPage {
        pending_transactions,
        pagination: Pagination::new(page, total),
    }))
}

pub async fn list_swaps(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<SwapsPage>, PaystrataError> {
    let page = PageRequest::from(query);
    let (swaps, total) = state.store.list_swaps(page).await?;

    Ok(Json(SwapsPage {
        swaps,
        pagination: Pagination::new(page, total),
    }))
}

pub async fn get_analytics(
    State(state): State<AppState>,
) -> Result<Json<Analytics>, PaystrataError> {
    Ok(Json(state.analytics.summary().await?))
}

pub async fn recent_activity(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecentActivity>>, PaystrataError> {
    Ok(Json(state.analytics.recent_activity().await?))
}
