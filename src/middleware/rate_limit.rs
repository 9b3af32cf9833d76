use crate::error::PaystrataError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter,
};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

/// Rate limiter keyed by client IP address.
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// How often idle client entries are dropped from the limiter.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Allows `max_requests` per `window_secs` for each client, replenished
/// evenly across the window.
pub fn create_ip_rate_limiter(max_requests: u32, window_secs: u64) -> IpRateLimiter {
    let burst = NonZeroU32::new(max_requests.max(1)).unwrap_or(NonZeroU32::MIN);
    let period_ms = (window_secs.saturating_mul(1000) / u64::from(burst.get())).max(1);
    let quota = Quota::with_period(Duration::from_millis(period_ms))
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst);

    Arc::new(RateLimiter::dashmap(quota))
}

/// Drops entries for clients whose quota has fully replenished.
pub fn prune(limiter: &IpRateLimiter) {
    limiter.retain_recent();
    limiter.shrink_to_fit();
}

/// Prunes `limiter` every `every` until the limiter itself is dropped.
pub fn spawn_pruning(limiter: &IpRateLimiter, every: Duration) {
    let limiter = Arc::downgrade(limiter);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            prune(&limiter);
            tracing::debug!(clients = limiter.len(), "Rate limiter pruned");
        }
    });
}

/// Middleware state: the limiter and whether `X-Forwarded-For` can be
/// believed.
#[derive(Clone)]
pub struct ClientRateLimit {
    pub limiter: IpRateLimiter,
    /// Only set when a reverse proxy overwrites `X-Forwarded-For`. Otherwise
    /// any client could pick a fresh key per request.
    pub trust_proxy: bool,
}

impl ClientRateLimit {
    pub fn new(limiter: IpRateLimiter, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }

    fn client_ip(&self, request: &Request) -> Option<IpAddr> {
        let forwarded = || {
            request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };
        let peer = || {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        };

        if self.trust_proxy {
            forwarded().or_else(peer)
        } else {
            peer()
        }
    }
}

pub async fn ip_rate_limit_middleware(
    State(rate_limit): State<ClientRateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, PaystrataError> {
    let Some(ip) = rate_limit.client_ip(&request) else {
        tracing::warn!("Could not determine client IP for rate limiting");
        return Ok(next.run(request).await);
    };

    if rate_limit.limiter.check_key(&ip).is_err() {
        tracing::warn!(client_ip = %ip, "Rate limit exceeded");
        return Err(PaystrataError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(limiter: IpRateLimiter, trust_proxy: bool) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                ClientRateLimit::new(limiter, trust_proxy),
                ip_rate_limit_middleware,
            ))
    }

    fn request(peer: &str, forwarded: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(ip) = forwarded {
            builder = builder.header("x-forwarded-for", ip);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        let addr: SocketAddr = format!("{}:40000", peer).parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[tokio::test]
    async fn requests_beyond_the_quota_are_rejected_per_peer() {
        let app = app(create_ip_rate_limiter(2, 900), false);

        for _ in 0..2 {
            let response = app.clone().oneshot(request("10.0.0.1", None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app.clone().oneshot(request("10.0.0.1", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.oneshot(request("10.0.0.2", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_header_is_ignored_without_a_trusted_proxy() {
        let app = app(create_ip_rate_limiter(2, 900), false);

        let mut statuses = Vec::new();
        for i in 0..3 {
            let spoofed = format!("192.0.2.{}", i);
            let response = app
                .clone()
                .oneshot(request("10.0.0.1", Some(&spoofed)))
                .await
                .unwrap();
            statuses.push(response.status());
        }

        assert_eq!(
            statuses,
            [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );
    }

    #[tokio::test]
    async fn trusted_proxy_keys_on_the_first_forwarded_address() {
        let app = app(create_ip_rate_limiter(1, 900), true);

        let response = app
            .clone()
            .oneshot(request("10.9.9.9", Some("203.0.113.5, 10.9.9.9")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("10.9.9.9", Some("203.0.113.5")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // Same proxy, different client.
        let response = app
            .oneshot(request("10.9.9.9", Some("203.0.113.6")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unidentified_clients_pass_through() {
        let response = app(create_ip_rate_limiter(1, 60), false)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn replenished_clients_are_pruned() {
        let limiter = create_ip_rate_limiter(1, 0);
        for i in 0..10u8 {
            let _ = limiter.check_key(&IpAddr::from([10, 0, 0, i]));
        }
        assert_eq!(limiter.len(), 10);

        tokio::time::sleep(Duration::from_millis(20)).await;
        prune(&limiter);

        assert!(limiter.is_empty());
    }
}
