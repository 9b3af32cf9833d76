use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A token swap queued by the payment front end. This service only reads
/// them for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SwapJob {
    pub id: Uuid,
    pub status: String,
    pub amount: String,
    pub from_token: String,
    pub to_token: String,
    pub user_address: String,
    pub refcode: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
