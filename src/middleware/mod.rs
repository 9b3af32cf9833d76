pub mod admin_auth;
pub mod rate_limit;
pub mod transaction_gate;

pub use admin_auth::require_admin;
pub use rate_limit::{
    create_ip_rate_limiter, ip_rate_limit_middleware, ClientRateLimit, IpRateLimiter,
};
pub use transaction_gate::{transaction_gate_layer, TransactionGate};
