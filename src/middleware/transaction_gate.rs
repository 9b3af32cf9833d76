use crate::{
    error::PaystrataError,
    models::{SettlementKind, TransactionStatus, VerifiedTransaction},
    services::store::Store,
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const TRANSACTION_HASH_HEADER: &str = "x-transaction-hash";
pub const REFERENCE_CODE_HEADER: &str = "x-reference-code";
pub const VERIFIED_HEADER: &str = "x-transaction-verified";
pub const TRANSACTION_ID_HEADER: &str = "x-transaction-id";
pub const TRANSACTION_TYPE_HEADER: &str = "x-transaction-type";

/// Admits a bill-fulfilment request only when it references a settlement
/// that can still back a purchase.
///
/// The gate only reads. Consuming the settlement is left to the handler so
/// that a biller failure can give it back.
#[derive(Clone)]
pub struct TransactionGate {
    store: Arc<dyn Store>,
}

impl TransactionGate {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn verify(
        &self,
        hash: Option<&str>,
        refcode: Option<&str>,
    ) -> Result<VerifiedTransaction, PaystrataError> {
        let (Some(hash), Some(refcode)) = (non_empty(hash), non_empty(refcode)) else {
            return Err(PaystrataError::MissingVerificationHeaders);
        };

        if let Some(pending) = self.store.find_pending(hash, refcode).await? {
            if pending.status != TransactionStatus::Pending {
                return Err(PaystrataError::TransactionAlreadyProcessed);
            }
            return Ok(VerifiedTransaction {
                id: pending.id,
                kind: SettlementKind::Pending,
            });
        }

        let transaction = self
            .store
            .find_transaction(hash, refcode)
            .await?
            .ok_or(PaystrataError::InvalidTransaction)?;

        if !transaction.status.is_success() {
            return Err(PaystrataError::TransactionNotSuccessful);
        }
        if transaction.used {
            return Err(PaystrataError::TransactionAlreadyUsed);
        }

        Ok(VerifiedTransaction {
            id: transaction.id,
            kind: SettlementKind::Completed,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

pub async fn transaction_gate_layer(
    gate: Arc<TransactionGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, PaystrataError> {
    let verified = gate
        .verify(
            header(request.headers(), TRANSACTION_HASH_HEADER),
            header(request.headers(), REFERENCE_CODE_HEADER),
        )
        .await?;

    tracing::debug!(
        transaction_id = %verified.id,
        kind = verified.kind.as_str(),
        "Settlement verified"
    );

    let headers = request.headers_mut();
    headers.insert(VERIFIED_HEADER, HeaderValue::from_static("true"));
    headers.insert(
        TRANSACTION_TYPE_HEADER,
        HeaderValue::from_static(verified.kind.as_str()),
    );
    if let Ok(id) = HeaderValue::from_str(&verified.id.to_string()) {
        headers.insert(TRANSACTION_ID_HEADER, id);
    }
    request.extensions_mut().insert(verified);

    Ok(next.run(request).await)
}
