use crate::{
    error::PaystrataError,
    models::{SettlementKind, TransactionStatus, VerifiedTransaction},
    services::store::{Store, StoreError},
};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

/// Attempts at recording a purchase the biller already delivered.
const FINALIZE_ATTEMPTS: u32 = 2;

/// Consumes verified settlements exactly once.
///
/// A settlement is claimed before the biller is called. A pending settlement
/// is promoted into the transactions table on success and marked failed
/// otherwise. A completed settlement gets its `used` flag back on failure so
/// the customer can retry.
///
/// Once the biller has delivered, the caller always gets the result. If the
/// promotion cannot be recorded the pending row is left `completed` so the
/// settlement cannot be spent again and the purchase can be reconciled.
#[derive(Clone)]
pub struct Settlement {
    store: Arc<dyn Store>,
}

impl Settlement {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn fulfil<T, F>(
        &self,
        verified: &VerifiedTransaction,
        fulfilment: F,
    ) -> Result<T, PaystrataError>
    where
        T: Debug,
        F: Future<Output = Result<T, PaystrataError>>,
    {
        self.claim(verified).await?;

        match fulfilment.await {
            Ok(value) => {
                self.finalize(verified, &value).await;
                tracing::info!(
                    transaction_id = %verified.id,
                    kind = verified.kind.as_str(),
                    "Settlement consumed"
                );
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    transaction_id = %verified.id,
                    error = %e,
                    "Fulfilment failed, releasing settlement"
                );
                if let Err(release_err) = self.release(verified).await {
                    tracing::error!(
                        transaction_id = %verified.id,
                        "Failed to release settlement: {}",
                        release_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn claim(&self, verified: &VerifiedTransaction) -> Result<(), PaystrataError> {
        match verified.kind {
            SettlementKind::Pending => {
                if !self.store.claim_pending(verified.id).await? {
                    return Err(PaystrataError::TransactionAlreadyProcessed);
                }
            }
            SettlementKind::Completed => {
                if !self.store.claim_transaction(verified.id).await? {
                    return Err(PaystrataError::TransactionAlreadyUsed);
                }
            }
        }
        Ok(())
    }

    async fn finalize<T: Debug>(&self, verified: &VerifiedTransaction, delivered: &T) {
        if verified.kind != SettlementKind::Pending {
            return;
        }

        for attempt in 1..=FINALIZE_ATTEMPTS {
            match self
                .store
                .promote_pending(verified.id, TransactionStatus::Processing, true)
                .await
            {
                // NotFound: already moved by a concurrent promotion.
                Ok(_) | Err(StoreError::NotFound(_)) => return,
                Err(e) => tracing::error!(
                    transaction_id = %verified.id,
                    attempt,
                    delivered = ?delivered,
                    error = %e,
                    "Biller delivered but the purchase could not be recorded"
                ),
            }
        }

        if let Err(e) = self
            .store
            .set_pending_status(verified.id, TransactionStatus::Completed)
            .await
        {
            tracing::error!(
                transaction_id = %verified.id,
                delivered = ?delivered,
                error = %e,
                "Delivered purchase needs manual reconciliation"
            );
        }
    }

    async fn release(&self, verified: &VerifiedTransaction) -> Result<(), StoreError> {
        match verified.kind {
            SettlementKind::Pending => {
                self.store
                    .set_pending_status(verified.id, TransactionStatus::Failed)
                    .await
            }
            SettlementKind::Completed => self.store.release_transaction(verified.id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::memory::tests::new_pending;
    use crate::services::store::testing::FailingPromotionStore;
    use crate::services::store::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, Settlement) {
        let store = Arc::new(MemoryStore::new());
        let settlement = Settlement::new(store.clone());
        (store, settlement)
    }

    #[tokio::test]
    async fn pending_settlement_is_promoted_and_used_once() {
        let (store, settlement) = setup();
        let pending = store.insert_pending(new_pending("0xabc", "REF1")).await.unwrap();
        let verified = VerifiedTransaction {
            id: pending.id,
            kind: SettlementKind::Pending,
        };

        let out = settlement.fulfil(&verified, async { Ok::<_, PaystrataError>(42) }).await;
        assert_eq!(out.unwrap(), 42);

        assert!(store.find_pending("0xabc", "REF1").await.unwrap().is_none());
        let promoted = store.find_transaction("0xabc", "REF1").await.unwrap().unwrap();
        assert!(promoted.used);
        assert_eq!(promoted.status, TransactionStatus::Success);

        let replay = settlement.fulfil(&verified, async { Ok::<_, PaystrataError>(1) }).await;
        assert!(matches!(replay, Err(PaystrataError::TransactionAlreadyProcessed)));
    }

    #[tokio::test]
    async fn failed_fulfilment_marks_pending_failed() {
        let (store, settlement) = setup();
        let pending = store.insert_pending(new_pending("0xdef", "REF2")).await.unwrap();
        let verified = VerifiedTransaction {
            id: pending.id,
            kind: SettlementKind::Pending,
        };

        let out = settlement
            .fulfil(&verified, async {
                Err::<(), _>(PaystrataError::Upstream("biller down".to_string()))
            })
            .await;
        assert!(matches!(out, Err(PaystrataError::Upstream(_))));

        let row = store.find_pending("0xdef", "REF2").await.unwrap().unwrap();
        assert_eq!(row.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn completed_settlement_is_released_on_failure() {
        let (store, settlement) = setup();
        let pending = store.insert_pending(new_pending("0x123", "REF3")).await.unwrap();
        let tx = store
            .promote_pending(pending.id, TransactionStatus::Pending, false)
            .await
            .unwrap();
        let verified = VerifiedTransaction {
            id: tx.id,
            kind: SettlementKind::Completed,
        };

        let failed = settlement
            .fulfil(&verified, async {
                Err::<(), _>(PaystrataError::Upstream("timeout".to_string()))
            })
            .await;
        assert!(failed.is_err());
        assert!(!store.find_transaction("0x123", "REF3").await.unwrap().unwrap().used);

        settlement
            .fulfil(&verified, async { Ok::<_, PaystrataError>(()) })
            .await
            .unwrap();
        let again = settlement
            .fulfil(&verified, async { Ok::<_, PaystrataError>(()) })
            .await;
        assert!(matches!(again, Err(PaystrataError::TransactionAlreadyUsed)));
    }

    #[tokio::test]
    async fn fulfilment_is_not_run_when_claim_fails() {
        let (_, settlement) = setup();
        let verified = VerifiedTransaction {
            id: uuid::Uuid::new_v4(),
            kind: SettlementKind::Completed,
        };
        let mut ran = false;

        let out = settlement
            .fulfil(&verified, async {
                ran = true;
                Ok::<_, PaystrataError>(())
            })
            .await;

        assert!(out.is_err());
        assert!(!ran);
    }

    #[tokio::test]
    async fn delivered_purchase_succeeds_when_recording_fails() {
        let store = Arc::new(FailingPromotionStore::default());
        let settlement = Settlement::new(store.clone());
        let pending = store.insert_pending(new_pending("0xfee", "REF4")).await.unwrap();
        let verified = VerifiedTransaction {
            id: pending.id,
            kind: SettlementKind::Pending,
        };

        let out = settlement
            .fulfil(&verified, async { Ok::<_, PaystrataError>("delivered") })
            .await;

        assert_eq!(out.unwrap(), "delivered");
        assert_eq!(store.attempts(), FINALIZE_ATTEMPTS);
        let row = store.find_pending("0xfee", "REF4").await.unwrap().unwrap();
        assert_eq!(row.status, TransactionStatus::Completed);

        let replay = settlement
            .fulfil(&verified, async { Ok::<_, PaystrataError>("again") })
            .await;
        assert!(matches!(replay, Err(PaystrataError::TransactionAlreadyProcessed)));
    }
}
