pub mod admin;
pub mod analytics;
pub mod biller;
pub mod refund;
pub mod response;
pub mod swap;
pub mod transaction;

pub use admin::*;
pub use analytics::*;
pub use biller::*;
pub use refund::*;
pub use response::*;
pub use swap::*;
pub use transaction::*;
