use super::AppState;
use crate::models::HealthStatus;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let database_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };
    let redis_ok = state.cache.ping().await.unwrap_or(false);

    let (status, code) = if database_ok && redis_ok {
        ("healthy", StatusCode::OK)
    } else if database_ok {
        ("degraded", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database_ok,
            redis: redis_ok,
            uptime_seconds: state.analytics.uptime_seconds(),
            timestamp: Utc::now(),
        }),
    )
}
