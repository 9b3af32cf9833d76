use crate::{error::PaystrataError, services::AuthService};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Requires a valid admin token and exposes its claims to handlers.
pub async fn require_admin(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, PaystrataError> {
    let token = bearer_token(&request)
        .ok_or_else(|| PaystrataError::Unauthorized("Access token required".to_string()))?;
    let claims = auth.validate_token(token)?;

    tracing::debug!(admin_id = %claims.sub, "Admin request authorized");
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdminClaims, AdminProfile};
    use crate::services::MemoryStore;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(auth: Arc<AuthService>) -> Router {
        Router::new()
            .route(
                "/admin",
                get(|Extension(claims): Extension<AdminClaims>| async move { claims.email }),
            )
            .layer(middleware::from_fn_with_state(auth, require_admin))
    }

    fn get_with(authorization: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/admin");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn valid_token_exposes_claims() {
        let auth = Arc::new(AuthService::new(
            Arc::new(MemoryStore::new()),
            "a-test-secret-that-is-long-enough!!",
            1,
        ));
        let token = auth
            .issue_token(&AdminProfile {
                id: Uuid::new_v4(),
                email: "ops@paystrata.com".to_string(),
                role: "admin".to_string(),
            })
            .unwrap();

        let response = app(auth)
            .oneshot(get_with(Some(&format!("Bearer {}", token))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ops@paystrata.com");
    }

    #[tokio::test]
    async fn missing_or_bad_tokens_are_unauthorized() {
        let auth = Arc::new(AuthService::new(
            Arc::new(MemoryStore::new()),
            "a-test-secret-that-is-long-enough!!",
            1,
        ));

        for header in [None, Some("Bearer "), Some("Basic abc"), Some("Bearer not-a-jwt")] {
            let response = app(auth.clone()).oneshot(get_with(header)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
