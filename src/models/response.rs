use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PendingTransaction, Refund, SwapJob, Transaction};

/// Success envelope shared by the public endpoints.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { status: true, data }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub database: bool,
    pub redis: bool,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        Self::new(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: total.div_ceil(u64::from(request.limit)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TransactionsPage {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransactionsPage {
    pub pending_transactions: Vec<PendingTransaction>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RefundsPage {
    pub refunds: Vec<Refund>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SwapsPage {
    pub swaps: Vec<SwapJob>,
    pub pagination: Pagination,
}

/// Envelope used by the pending-transaction and admin search endpoints.
#[derive(Serialize, Deserialize, Debug)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
