//! Store doubles for failure paths the in-memory store cannot produce.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use super::{MemoryStore, Store, StoreError, StoreResult};
use crate::models::{
    AdminUser, NewPendingTransaction, NewRefund, PageRequest, PendingTransaction, Refund,
    SwapJob, Transaction, TransactionStatus,
};

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

/// Every call fails as if the database were unreachable.
pub(crate) struct UnavailableStore;

#[async_trait]
impl Store for UnavailableStore {
    async fn ping(&self) -> StoreResult<()> {
        down()
    }
    async fn find_pending(&self, _: &str, _: &str) -> StoreResult<Option<PendingTransaction>> {
        down()
    }
    async fn find_transaction(&self, _: &str, _: &str) -> StoreResult<Option<Transaction>> {
        down()
    }
    async fn insert_pending(&self, _: NewPendingTransaction) -> StoreResult<PendingTransaction> {
        down()
    }
    async fn update_pending_status(
        &self,
        _: &str,
        _: &str,
        _: TransactionStatus,
    ) -> StoreResult<Option<PendingTransaction>> {
        down()
    }
    async fn set_pending_status(&self, _: Uuid, _: TransactionStatus) -> StoreResult<()> {
        down()
    }
    async fn claim_pending(&self, _: Uuid) -> StoreResult<bool> {
        down()
    }
    async fn promote_pending(
        &self,
        _: Uuid,
        _: TransactionStatus,
        _: bool,
    ) -> StoreResult<Transaction> {
        down()
    }
    async fn claim_transaction(&self, _: Uuid) -> StoreResult<bool> {
        down()
    }
    async fn release_transaction(&self, _: Uuid) -> StoreResult<()> {
        down()
    }
    async fn list_transactions(&self, _: PageRequest) -> StoreResult<(Vec<Transaction>, u64)> {
        down()
    }
    async fn search_transactions(
        &self,
        _: Option<&str>,
        _: Option<&str>,
    ) -> StoreResult<Vec<Transaction>> {
        down()
    }
    async fn list_pending(&self, _: PageRequest) -> StoreResult<(Vec<PendingTransaction>, u64)> {
        down()
    }
    async fn list_refunds(&self, _: PageRequest) -> StoreResult<(Vec<Refund>, u64)> {
        down()
    }
    async fn create_refund(&self, _: NewRefund) -> StoreResult<Refund> {
        down()
    }
    async fn process_refund(&self, _: Uuid) -> StoreResult<Refund> {
        down()
    }
    async fn list_swaps(&self, _: PageRequest) -> StoreResult<(Vec<SwapJob>, u64)> {
        down()
    }
    async fn find_admin_by_email(&self, _: &str) -> StoreResult<Option<AdminUser>> {
        down()
    }
    async fn upsert_admin(&self, _: &str, _: &str, _: &str) -> StoreResult<AdminUser> {
        down()
    }
}

/// A [`MemoryStore`] whose promotions always fail. Counts the attempts.
#[derive(Default)]
pub(crate) struct FailingPromotionStore {
    pub inner: MemoryStore,
    pub promote_attempts: AtomicU32,
}

impl FailingPromotionStore {
    pub fn attempts(&self) -> u32 {
        self.promote_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for FailingPromotionStore {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
    async fn find_pending(&self, h: &str, r: &str) -> StoreResult<Option<PendingTransaction>> {
        self.inner.find_pending(h, r).await
    }
    async fn find_transaction(&self, h: &str, r: &str) -> StoreResult<Option<Transaction>> {
        self.inner.find_transaction(h, r).await
    }
    async fn insert_pending(&self, new: NewPendingTransaction) -> StoreResult<PendingTransaction> {
        self.inner.insert_pending(new).await
    }
    async fn update_pending_status(
        &self,
        h: &str,
        r: &str,
        status: TransactionStatus,
    ) -> StoreResult<Option<PendingTransaction>> {
        self.inner.update_pending_status(h, r, status).await
    }
    async fn set_pending_status(&self, id: Uuid, status: TransactionStatus) -> StoreResult<()> {
        self.inner.set_pending_status(id, status).await
    }
    async fn claim_pending(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.claim_pending(id).await
    }
    async fn promote_pending(
        &self,
        _: Uuid,
        _: TransactionStatus,
        _: bool,
    ) -> StoreResult<Transaction> {
        self.promote_attempts.fetch_add(1, Ordering::SeqCst);
        down()
    }
    async fn claim_transaction(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.claim_transaction(id).await
    }
    async fn release_transaction(&self, id: Uuid) -> StoreResult<()> {
        self.inner.release_transaction(id).await
    }
    async fn list_transactions(&self, page: PageRequest) -> StoreResult<(Vec<Transaction>, u64)> {
        self.inner.list_transactions(page).await
    }
    async fn search_transactions(
        &self,
        reference: Option<&str>,
        wallet_address: Option<&str>,
    ) -> StoreResult<Vec<Transaction>> {
        self.inner.search_transactions(reference, wallet_address).await
    }
    async fn list_pending(&self, page: PageRequest) -> StoreResult<(Vec<PendingTransaction>, u64)> {
        self.inner.list_pending(page).await
    }
    async fn list_refunds(&self, page: PageRequest) -> StoreResult<(Vec<Refund>, u64)> {
        self.inner.list_refunds(page).await
    }
    async fn create_refund(&self, new: NewRefund) -> StoreResult<Refund> {
        self.inner.create_refund(new).await
    }
    async fn process_refund(&self, id: Uuid) -> StoreResult<Refund> {
        self.inner.process_refund(id).await
    }
    async fn list_swaps(&self, page: PageRequest) -> StoreResult<(Vec<SwapJob>, u64)> {
        self.inner.list_swaps(page).await
    }
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        self.inner.find_admin_by_email(email).await
    }
    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> StoreResult<AdminUser> {
        self.inner.upsert_admin(email, password_hash, role).await
    }
}
