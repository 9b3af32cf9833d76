use super::AppState;
use crate::error::PaystrataError;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{interval, Duration};

const PUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub token: Option<String>,
}

/// Browsers cannot set headers on a websocket handshake, so the admin token
/// travels in the query string. The token is checked before the upgrade.
pub async fn dashboard_socket(
    ws: Option<WebSocketUpgrade>,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, PaystrataError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PaystrataError::Unauthorized("Access token required".to_string()))?;
    let claims = state.auth.validate_token(&token)?;
    let ws = ws.ok_or_else(|| {
        PaystrataError::Validation("WebSocket upgrade required".to_string())
    })?;

    tracing::info!(admin_id = %claims.sub, "Dashboard socket opened");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut ticker = interval(PUSH_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let summary = match state.analytics.summary().await {
                    Ok(summary) => summary,
                    Err(e) => {
                        tracing::warn!("Dashboard analytics failed: {}", e);
                        continue;
                    }
                };

                if let Ok(msg) = serde_json::to_string(&summary) {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("Dashboard socket closed");
}
