pub mod admin;
pub mod billing;
pub mod dashboard;
pub mod extract;
pub mod health;
pub mod pending;
pub mod price;
pub mod refunds;

pub use admin::*;
pub use billing::*;
pub use dashboard::*;
pub use extract::JsonBody;
pub use health::*;
pub use pending::*;
pub use price::*;
pub use refunds::*;

use crate::services::{
    AnalyticsService, AuthService, BillerClient, CacheService, PriceService, Settlement, Store,
};
use std::sync::Arc;

/// Shared handles for every route.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Arc<CacheService>,
    pub biller: Arc<BillerClient>,
    pub prices: Arc<PriceService>,
    pub auth: Arc<AuthService>,
    pub analytics: Arc<AnalyticsService>,
    pub settlement: Settlement,
}

#[cfg(test)]
pub(crate) fn test_state(store: Arc<dyn Store>) -> AppState {
    let cache = Arc::new(CacheService::memory_only(60));
    AppState {
        store: store.clone(),
        cache: cache.clone(),
        biller: Arc::new(
            BillerClient::new("http://127.0.0.1:9", "CK100".to_string(), "key".to_string())
                .expect("biller client"),
        ),
        prices: Arc::new(
            PriceService::new("http://127.0.0.1:9", None, cache, 60).expect("price service"),
        ),
        auth: Arc::new(AuthService::new(
            store.clone(),
            "handler-test-secret-with-32-characters",
            1,
        )),
        analytics: Arc::new(AnalyticsService::new(store.clone(), rust_decimal::Decimal::ZERO)),
        settlement: Settlement::new(store),
    }
}
