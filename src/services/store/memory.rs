use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{already_processed, Store, StoreError, StoreResult};
use crate::models::{
    AdminUser, NewPendingTransaction, NewRefund, PageRequest, PendingTransaction, Refund,
    RefundStatus, SwapJob, Transaction, TransactionStatus,
};

#[derive(Default)]
struct MemoryState {
    transactions: Vec<Transaction>,
    pending: Vec<PendingTransaction>,
    refunds: Vec<Refund>,
    swaps: Vec<SwapJob>,
    admins: Vec<AdminUser>,
}

/// In-process store. All rows live behind one lock, which also makes every
/// compound operation atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

fn matches_key(hash: &Option<String>, refcode: &Option<String>, h: &str, r: &str) -> bool {
    hash.as_deref() == Some(h) && refcode.as_deref() == Some(r)
}

/// Newest first, then the requested page.
fn paginate<T: Clone>(
    rows: &[T],
    created_at: impl Fn(&T) -> chrono::DateTime<Utc>,
    page: PageRequest,
) -> (Vec<T>, u64) {
    let mut sorted: Vec<T> = rows.to_vec();
    sorted.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    let total = sorted.len() as u64;
    let items = sorted
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (items, total)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a settled transaction directly. Used to seed fixtures.
    pub async fn insert_transaction(&self, transaction: Transaction) {
        self.state.write().await.transactions.push(transaction);
    }

    pub async fn insert_swap(&self, swap: SwapJob) {
        self.state.write().await.swaps.push(swap);
    }

    pub async fn transaction(&self, id: Uuid) -> Option<Transaction> {
        self.state
            .read()
            .await
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub async fn pending(&self, id: Uuid) -> Option<PendingTransaction> {
        self.state
            .read()
            .await
            .pending
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_pending(
        &self,
        hash: &str,
        refcode: &str,
    ) -> StoreResult<Option<PendingTransaction>> {
        let state = self.state.read().await;
        Ok(state
            .pending
            .iter()
            .find(|p| matches_key(&p.hash, &p.refcode, hash, refcode))
            .cloned())
    }

    async fn find_transaction(&self, hash: &str, refcode: &str) -> StoreResult<Option<Transaction>> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .find(|t| matches_key(&t.hash, &t.refcode, hash, refcode))
            .cloned())
    }

    async fn insert_pending(&self, new: NewPendingTransaction) -> StoreResult<PendingTransaction> {
        let mut state = self.state.write().await;
        let refcode = Some(new.refcode.as_str());
        if state.pending.iter().any(|p| p.refcode.as_deref() == refcode)
            || state.transactions.iter().any(|t| t.refcode.as_deref() == refcode)
        {
            return Err(StoreError::Conflict(format!(
                "Transaction with refcode {} already exists",
                new.refcode
            )));
        }

        let now = Utc::now();
        let pending = PendingTransaction {
            id: Uuid::new_v4(),
            amount: new.amount,
            txn_type: new.txn_type,
            wallet_address: new.wallet_address,
            status: new.status,
            hash: Some(new.hash),
            refcode: Some(new.refcode),
            phone_number: new.phone_number,
            iuc_number: new.iuc_number,
            meter_number: new.meter_number,
            network: new.network,
            stark_amount: Some(new.stark_amount),
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.pending.push(pending.clone());
        Ok(pending)
    }

    async fn update_pending_status(
        &self,
        hash: &str,
        refcode: &str,
        status: TransactionStatus,
    ) -> StoreResult<Option<PendingTransaction>> {
        let mut state = self.state.write().await;
        let Some(pending) = state
            .pending
            .iter_mut()
            .find(|p| matches_key(&p.hash, &p.refcode, hash, refcode))
        else {
            return Ok(None);
        };
        if pending.status != TransactionStatus::Pending {
            return Err(already_processed());
        }

        let now = Utc::now();
        pending.status = status;
        pending.completed_at = (status != TransactionStatus::Pending).then_some(now);
        pending.updated_at = now;
        Ok(Some(pending.clone()))
    }

    async fn set_pending_status(&self, id: Uuid, status: TransactionStatus) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let pending = state
            .pending
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound("Pending transaction not found".to_string()))?;
        pending.status = status;
        pending.updated_at = Utc::now();
        Ok(())
    }

    async fn claim_pending(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state
            .pending
            .iter_mut()
            .find(|p| p.id == id && p.status == TransactionStatus::Pending)
        {
            Some(pending) => {
                pending.status = TransactionStatus::Processing;
                pending.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn promote_pending(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        used: bool,
    ) -> StoreResult<Transaction> {
        let mut state = self.state.write().await;
        let index = state
            .pending
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound("Pending transaction not found".to_string()))?;
        if state.pending[index].status != expected {
            return Err(already_processed());
        }
        let pending = state.pending.remove(index);

        if let Some(existing) = state
            .transactions
            .iter()
            .find(|t| t.refcode.is_some() && t.refcode == pending.refcode)
        {
            return Ok(existing.clone());
        }

        let transaction = Transaction {
            id: pending.id,
            amount: pending.amount,
            txn_type: pending.txn_type,
            wallet_address: pending.wallet_address,
            status: TransactionStatus::Success,
            hash: pending.hash,
            refcode: pending.refcode,
            phone_number: pending.phone_number,
            iuc_number: pending.iuc_number,
            meter_number: pending.meter_number,
            network: pending.network,
            stark_amount: pending.stark_amount,
            refunded: false,
            used,
            created_at: pending.created_at,
            updated_at: Utc::now(),
        };
        state.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn claim_transaction(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.transactions.iter_mut().find(|t| t.id == id && !t.used) {
            Some(transaction) => {
                transaction.used = true;
                transaction.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn release_transaction(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(transaction) = state.transactions.iter_mut().find(|t| t.id == id) {
            transaction.used = false;
            transaction.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_transactions(&self, page: PageRequest) -> StoreResult<(Vec<Transaction>, u64)> {
        let state = self.state.read().await;
        Ok(paginate(&state.transactions, |t| t.created_at, page))
    }

    async fn search_transactions(
        &self,
        reference: Option<&str>,
        wallet_address: Option<&str>,
    ) -> StoreResult<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut found: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| reference.map_or(true, |r| t.refcode.as_deref() == Some(r)))
            .filter(|t| wallet_address.map_or(true, |w| t.wallet_address.eq_ignore_ascii_case(w)))
            .cloned()
            .collect();
        found.sort_by_key(|t| std::cmp::Reverse(t.created_at));
        Ok(found)
    }

    async fn list_pending(
        &self,
        page: PageRequest,
    ) -> StoreResult<(Vec<PendingTransaction>, u64)> {
        let state = self.state.read().await;
        Ok(paginate(&state.pending, |p| p.created_at, page))
    }

    async fn list_refunds(&self, page: PageRequest) -> StoreResult<(Vec<Refund>, u64)> {
        let state = self.state.read().await;
        Ok(paginate(&state.refunds, |r| r.created_at, page))
    }

    async fn create_refund(&self, new: NewRefund) -> StoreResult<Refund> {
        let mut state = self.state.write().await;
        if !state.transactions.iter().any(|t| t.id == new.transaction_id) {
            return Err(StoreError::NotFound("Transaction not found".to_string()));
        }

        let now = Utc::now();
        let refund = Refund {
            id: Uuid::new_v4(),
            transaction_id: new.transaction_id,
            amount: new.amount,
            reason: new.reason,
            status: RefundStatus::Pending,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.refunds.push(refund.clone());
        Ok(refund)
    }

    async fn process_refund(&self, id: Uuid) -> StoreResult<Refund> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let refund = state
            .refunds
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound("Refund not found".to_string()))?;
        if refund.status != RefundStatus::Pending {
            return Err(StoreError::Conflict("Refund already processed".to_string()));
        }
        refund.status = RefundStatus::Completed;
        refund.processed_at = Some(now);
        refund.updated_at = now;
        let refund = refund.clone();

        if let Some(transaction) = state
            .transactions
            .iter_mut()
            .find(|t| t.id == refund.transaction_id)
        {
            transaction.refunded = true;
            transaction.updated_at = now;
        }

        Ok(refund)
    }

    async fn list_swaps(&self, page: PageRequest) -> StoreResult<(Vec<SwapJob>, u64)> {
        let state = self.state.read().await;
        Ok(paginate(&state.swaps, |s| s.created_at, page))
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        let state = self.state.read().await;
        Ok(state
            .admins
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> StoreResult<AdminUser> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        if let Some(admin) = state
            .admins
            .iter_mut()
            .find(|a| a.email.eq_ignore_ascii_case(email))
        {
            admin.password_hash = password_hash.to_string();
            admin.role = role.to_string();
            admin.updated_at = now;
            return Ok(admin.clone());
        }

        let admin = AdminUser {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.admins.push(admin.clone());
        Ok(admin)
    }
}
