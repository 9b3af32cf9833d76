pub mod analytics;
pub mod auth;
pub mod biller;
pub mod cache;
pub mod price;
pub mod settlement;
pub mod store;

pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use biller::BillerClient;
pub use cache::CacheService;
pub use price::PriceService;
pub use settlement::Settlement;
pub use store::{MemoryStore, PgStore, Store, StoreError};
