//! Persistence for payments, refunds, swap jobs and admin accounts.
//!
//! [`PgStore`] is the production backend. [`MemoryStore`] keeps the same
//! semantics in process and backs development runs without a database as
//! well as the test suite.

pub(crate) mod memory;
mod postgres;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AdminUser, NewPendingTransaction, NewRefund, PageRequest, PendingTransaction, Refund,
    SwapJob, Transaction, TransactionStatus,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub(crate) fn already_processed() -> StoreError {
    StoreError::Conflict("Transaction already processed".to_string())
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Settlement lookups used by the verification gate.
    async fn find_pending(&self, hash: &str, refcode: &str)
        -> StoreResult<Option<PendingTransaction>>;
    async fn find_transaction(&self, hash: &str, refcode: &str)
        -> StoreResult<Option<Transaction>>;

    /// Fails with `Conflict` when the refcode is already known, either as a
    /// pending row or as a settled transaction.
    async fn insert_pending(&self, new: NewPendingTransaction) -> StoreResult<PendingTransaction>;

    /// Sets the status of the pending row identified by (hash, refcode).
    /// Only rows still `pending` can change. Returns `None` when no such row
    /// exists and `Conflict` when the row has already left `pending`.
    async fn update_pending_status(
        &self,
        hash: &str,
        refcode: &str,
        status: TransactionStatus,
    ) -> StoreResult<Option<PendingTransaction>>;

    async fn set_pending_status(&self, id: Uuid, status: TransactionStatus) -> StoreResult<()>;

    /// Atomically moves a pending row from `pending` to `processing`.
    /// Returns `false` if the row is missing or no longer pending.
    async fn claim_pending(&self, id: Uuid) -> StoreResult<bool>;

    /// Moves a pending row whose status is `expected` into the transactions
    /// table with status `success`. If a transaction with the same refcode
    /// already exists it is returned unchanged. Fails with `NotFound` when
    /// the pending row is gone and `Conflict` when its status differs.
    async fn promote_pending(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        used: bool,
    ) -> StoreResult<Transaction>;

    /// Atomically flips `used` from false to true. Returns `false` if the
    /// transaction was already used or does not exist.
    async fn claim_transaction(&self, id: Uuid) -> StoreResult<bool>;

    async fn release_transaction(&self, id: Uuid) -> StoreResult<()>;

    async fn list_transactions(&self, page: PageRequest) -> StoreResult<(Vec<Transaction>, u64)>;
    async fn search_transactions(
        &self,
        reference: Option<&str>,
        wallet_address: Option<&str>,
    ) -> StoreResult<Vec<Transaction>>;
    async fn list_pending(&self, page: PageRequest)
        -> StoreResult<(Vec<PendingTransaction>, u64)>;

    async fn list_refunds(&self, page: PageRequest) -> StoreResult<(Vec<Refund>, u64)>;
    async fn create_refund(&self, new: NewRefund) -> StoreResult<Refund>;
    /// Completes a pending refund and flags its transaction as refunded.
    async fn process_refund(&self, id: Uuid) -> StoreResult<Refund>;

    async fn list_swaps(&self, page: PageRequest) -> StoreResult<(Vec<SwapJob>, u64)>;

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>>;
    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> StoreResult<AdminUser>;
}
