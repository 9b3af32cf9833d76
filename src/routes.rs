use crate::{
    config::Config,
    handlers::*,
    middleware::{
        create_ip_rate_limiter, ip_rate_limit_middleware, rate_limit, require_admin,
        transaction_gate_layer, ClientRateLimit, TransactionGate,
    },
};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

fn cors_layer(config: &Config) -> CorsLayer {
    if config.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-transaction-hash"),
            HeaderName::from_static("x-reference-code"),
        ])
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let gate = Arc::new(TransactionGate::new(state.store.clone()));

    // Bill fulfilment, admitted only with a verified settlement.
    let billing = Router::new()
        .route("/api/buy-airtime", post(buy_airtime))
        .route("/api/buy-data", post(buy_data))
        .route("/api/pay-cable", post(pay_cable))
        .route("/api/pay-utility", post(pay_utility))
        .route_layer(middleware::from_fn(move |req, next| {
            let gate = gate.clone();
            async move { transaction_gate_layer(gate, req, next).await }
        }));

    let admin = Router::new()
        .route("/api/admin/transactions", get(list_transactions))
        .route("/api/admin/search-txn", get(search_transactions))
        .route("/api/admin/pending-transactions", get(list_pending_transactions))
        .route("/api/admin/swaps", get(list_swaps))
        .route("/api/admin/analytics", get(get_analytics))
        .route("/api/admin/recent-activity", get(recent_activity))
        .route("/api/refunds", get(list_refunds).post(create_refund))
        .route("/api/refunds/:id/process", put(process_refund))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_admin,
        ));

    let limiter = create_ip_rate_limiter(
        config.rate_limit_max_requests,
        config.rate_limit_window_secs,
    );
    rate_limit::spawn_pruning(&limiter, rate_limit::PRUNE_INTERVAL);
    let rate_limit = ClientRateLimit::new(limiter, config.trust_proxy);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/stark-price", get(stark_price).post(stark_price))
        .route("/api/utility/plans", post(utility_plans))
        .route(
            "/api/pending-transactions",
            post(store_pending_transaction).put(update_pending_transaction),
        )
        .route("/api/admin/login", post(admin_login))
        .route("/ws/admin/dashboard", get(dashboard_socket))
        .merge(billing)
        .merge(admin)
        .layer(middleware::from_fn_with_state(
            rate_limit,
            ip_rate_limit_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(cors_layer(config))
        .with_state(state)
}
