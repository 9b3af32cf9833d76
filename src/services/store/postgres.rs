use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{already_processed, Store, StoreError, StoreResult};
use crate::models::{
    AdminUser, NewPendingTransaction, NewRefund, PageRequest, PendingTransaction, Refund,
    SwapJob, Transaction, TransactionStatus,
};

const TRANSACTION_COLUMNS: &str = "id, amount, txn_type, wallet_address, status, hash, refcode, \
     phone_number, iuc_number, meter_number, network, stark_amount, refunded, used, \
     created_at, updated_at";

const PENDING_COLUMNS: &str = "id, amount, txn_type, wallet_address, status, hash, refcode, \
     phone_number, iuc_number, meter_number, network, stark_amount, completed_at, \
     created_at, updated_at";

const REFUND_COLUMNS: &str =
    "id, transaction_id, amount, reason, status, processed_at, created_at, updated_at";

const SWAP_COLUMNS: &str = "id, status, amount, from_token, to_token, user_address, refcode, \
     result, error, created_at, updated_at";

const ADMIN_COLUMNS: &str = "id, email, password_hash, role, created_at, updated_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        info!(max_connections = max_connections, "Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn count(&self, table: &str) -> StoreResult<u64> {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_pending(
        &self,
        hash: &str,
        refcode: &str,
    ) -> StoreResult<Option<PendingTransaction>> {
        let pending = sqlx::query_as::<_, PendingTransaction>(&format!(
            "SELECT {} FROM pending_transactions WHERE hash = $1 AND refcode = $2",
            PENDING_COLUMNS
        ))
        .bind(hash)
        .bind(refcode)
        .fetch_optional(&self.pool)
        .await?;
        Ok(pending)
    }

    #[instrument(skip(self))]
    async fn find_transaction(&self, hash: &str, refcode: &str) -> StoreResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions WHERE hash = $1 AND refcode = $2",
            TRANSACTION_COLUMNS
        ))
        .bind(hash)
        .bind(refcode)
        .fetch_optional(&self.pool)
        .await?;
        Ok(transaction)
    }

    #[instrument(skip(self, new), fields(refcode = %new.refcode))]
    async fn insert_pending(&self, new: NewPendingTransaction) -> StoreResult<PendingTransaction> {
        let conflict = || {
            StoreError::Conflict(format!(
                "Transaction with refcode {} already exists",
                new.refcode
            ))
        };

        // A refcode that was already settled must never reopen as pending.
        let inserted = sqlx::query_as::<_, PendingTransaction>(&format!(
            r#"
            INSERT INTO pending_transactions
                (hash, refcode, wallet_address, amount, stark_amount, txn_type, status,
                 phone_number, iuc_number, meter_number, network)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
            WHERE NOT EXISTS (SELECT 1 FROM transactions WHERE refcode = $2)
            RETURNING {}
            "#,
            PENDING_COLUMNS
        ))
        .bind(&new.hash)
        .bind(&new.refcode)
        .bind(&new.wallet_address)
        .bind(new.amount)
        .bind(new.stark_amount)
        .bind(new.txn_type.as_str())
        .bind(new.status.as_str())
        .bind(&new.phone_number)
        .bind(&new.iuc_number)
        .bind(&new.meter_number)
        .bind(&new.network)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict()
            } else {
                StoreError::from(e)
            }
        })?;

        inserted.ok_or_else(conflict)
    }

    async fn update_pending_status(
        &self,
        hash: &str,
        refcode: &str,
        status: TransactionStatus,
    ) -> StoreResult<Option<PendingTransaction>> {
        let updated = sqlx::query_as::<_, PendingTransaction>(&format!(
            r#"
            UPDATE pending_transactions
            SET status = $3,
                completed_at = CASE WHEN $3 = 'pending' THEN NULL ELSE NOW() END,
                updated_at = NOW()
            WHERE hash = $1 AND refcode = $2 AND status = 'pending'
            RETURNING {}
            "#,
            PENDING_COLUMNS
        ))
        .bind(hash)
        .bind(refcode)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            return Ok(updated);
        }

        match self.find_pending(hash, refcode).await? {
            Some(_) => Err(already_processed()),
            None => Ok(None),
        }
    }

    async fn set_pending_status(&self, id: Uuid, status: TransactionStatus) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE pending_transactions SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Pending transaction not found".to_string()));
        }
        Ok(())
    }

    async fn claim_pending(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pending_transactions
            SET status = 'processing', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn promote_pending(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        used: bool,
    ) -> StoreResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let pending = sqlx::query_as::<_, PendingTransaction>(&format!(
            "SELECT {} FROM pending_transactions WHERE id = $1 FOR UPDATE",
            PENDING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound("Pending transaction not found".to_string()))?;
        if pending.status != expected {
            return Err(already_processed());
        }

        let inserted = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions
                (id, amount, txn_type, wallet_address, status, hash, refcode, phone_number,
                 iuc_number, meter_number, network, stark_amount, used, created_at)
            SELECT id, amount, txn_type, wallet_address, 'success', hash, refcode, phone_number,
                   iuc_number, meter_number, network, stark_amount, $2, created_at
            FROM pending_transactions
            WHERE id = $1
            ON CONFLICT (refcode) DO NOTHING
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .bind(used)
        .fetch_optional(&mut *tx)
        .await?;

        let transaction = match inserted {
            Some(transaction) => transaction,
            None => {
                tracing::warn!(refcode = ?pending.refcode, "Transaction already promoted");
                sqlx::query_as::<_, Transaction>(&format!(
                    "SELECT {} FROM transactions WHERE refcode = $1",
                    TRANSACTION_COLUMNS
                ))
                .bind(&pending.refcode)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        sqlx::query("DELETE FROM pending_transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(transaction_id = %transaction.id, "Pending transaction promoted");
        Ok(transaction)
    }

    async fn claim_transaction(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE transactions SET used = TRUE, updated_at = NOW() WHERE id = $1 AND used = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_transaction(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE transactions SET used = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_transactions(&self, page: PageRequest) -> StoreResult<(Vec<Transaction>, u64)> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            TRANSACTION_COLUMNS
        ))
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok((rows, self.count("transactions").await?))
    }

    async fn search_transactions(
        &self,
        reference: Option<&str>,
        wallet_address: Option<&str>,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE ($1::TEXT IS NULL OR refcode = $1)
              AND ($2::TEXT IS NULL OR LOWER(wallet_address) = LOWER($2))
            ORDER BY created_at DESC
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .bind(wallet_address)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_pending(
        &self,
        page: PageRequest,
    ) -> StoreResult<(Vec<PendingTransaction>, u64)> {
        let rows = sqlx::query_as::<_, PendingTransaction>(&format!(
            "SELECT {} FROM pending_transactions ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            PENDING_COLUMNS
        ))
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok((rows, self.count("pending_transactions").await?))
    }

    async fn list_refunds(&self, page: PageRequest) -> StoreResult<(Vec<Refund>, u64)> {
        let rows = sqlx::query_as::<_, Refund>(&format!(
            "SELECT {} FROM refunds ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            REFUND_COLUMNS
        ))
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok((rows, self.count("refunds").await?))
    }

    #[instrument(skip(self, new), fields(transaction_id = %new.transaction_id))]
    async fn create_refund(&self, new: NewRefund) -> StoreResult<Refund> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM transactions WHERE id = $1)")
                .bind(new.transaction_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(StoreError::NotFound("Transaction not found".to_string()));
        }

        let refund = sqlx::query_as::<_, Refund>(&format!(
            r#"
            INSERT INTO refunds (transaction_id, amount, reason)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            REFUND_COLUMNS
        ))
        .bind(new.transaction_id)
        .bind(new.amount)
        .bind(&new.reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(refund)
    }

    #[instrument(skip(self))]
    async fn process_refund(&self, id: Uuid) -> StoreResult<Refund> {
        let mut tx = self.pool.begin().await?;

        let refund = sqlx::query_as::<_, Refund>(&format!(
            r#"
            UPDATE refunds
            SET status = 'completed', processed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            REFUND_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(refund) = refund else {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM refunds WHERE id = $1)")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            return Err(if exists {
                StoreError::Conflict("Refund already processed".to_string())
            } else {
                StoreError::NotFound("Refund not found".to_string())
            });
        };

        sqlx::query("UPDATE transactions SET refunded = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(refund.transaction_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(refund)
    }

    async fn list_swaps(&self, page: PageRequest) -> StoreResult<(Vec<SwapJob>, u64)> {
        let rows = sqlx::query_as::<_, SwapJob>(&format!(
            "SELECT {} FROM swap_jobs ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            SWAP_COLUMNS
        ))
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok((rows, self.count("swap_jobs").await?))
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminUser>> {
        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {} FROM admin_users WHERE LOWER(email) = LOWER($1)",
            ADMIN_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn upsert_admin(
        &self,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> StoreResult<AdminUser> {
        let admin = sqlx::query_as::<_, AdminUser>(&format!(
            r#"
            INSERT INTO admin_users (email, password_hash, role)
            VALUES (LOWER($1), $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET password_hash = EXCLUDED.password_hash,
                role = EXCLUDED.role,
                updated_at = NOW()
            RETURNING {}
            "#,
            ADMIN_COLUMNS
        ))
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(admin)
    }
}
