use super::{AppState, JsonBody};
use crate::{
    error::PaystrataError,
    models::{
        NewPendingTransaction, PendingTransaction, StorePendingRequest, SuccessResponse,
        Transaction, TransactionStatus, TransactionType, UpdatePendingRequest,
    },
};
use axum::{extract::State, Json};
use serde::Serialize;

fn missing_fields() -> PaystrataError {
    PaystrataError::Validation("Missing required fields".to_string())
}

fn required(value: Option<String>) -> Result<String, PaystrataError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(missing_fields)
}

impl TryFrom<StorePendingRequest> for NewPendingTransaction {
    type Error = PaystrataError;

    fn try_from(body: StorePendingRequest) -> Result<Self, Self::Error> {
        let hash = required(body.hash)?;
        let refcode = required(body.refcode)?;
        let wallet_address = required(body.wallet_address)?;
        let amount = body.amount.ok_or_else(missing_fields)?;
        let stark_amount = body.stark_amount.ok_or_else(missing_fields)?;
        let txn_type: TransactionType = required(body.txn_type)?
            .parse()
            .map_err(|e| PaystrataError::Validation(format!("Invalid txn_type: {}", e)))?;
        let status = match body.status.as_deref().map(str::trim) {
            None | Some("") => TransactionStatus::Pending,
            Some(s) => s
                .parse()
                .map_err(|e| PaystrataError::Validation(format!("Invalid status: {}", e)))?,
        };

        Ok(Self {
            hash,
            refcode,
            wallet_address,
            amount,
            stark_amount,
            txn_type,
            status,
            phone_number: body.phone_number,
            iuc_number: body.iuc_number,
            meter_number: body.meter_number,
            network: body.network,
        })
    }
}

pub async fn store_pending_transaction(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<StorePendingRequest>,
) -> Result<Json<SuccessResponse<PendingTransaction>>, PaystrataError> {
    let new = NewPendingTransaction::try_from(body)?;
    let pending = state.store.insert_pending(new).await?;

    tracing::info!(
        id = %pending.id,
        txn_type = %pending.txn_type,
        "Pending transaction stored"
    );
    Ok(Json(SuccessResponse::new(pending)))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PendingUpdate {
    Updated(PendingTransaction),
    Promoted(Transaction),
}

/// Applies an external settlement status to a pending transaction. A
/// `completed` status moves the row into the transactions table.
pub async fn update_pending_transaction(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UpdatePendingRequest>,
) -> Result<Json<SuccessResponse<PendingUpdate>>, PaystrataError> {
    let hash = required(body.hash)?;
    let refcode = required(body.refcode)?;
    let status = match required(body.status)?.parse::<TransactionStatus>() {
        Ok(
            s @ (TransactionStatus::Pending
            | TransactionStatus::Completed
            | TransactionStatus::Failed),
        ) => s,
        _ => {
            return Err(PaystrataError::Validation(
                "Invalid status. Must be pending, completed, or failed".to_string(),
            ))
        }
    };

    let not_found = || PaystrataError::NotFound("Pending transaction not found".to_string());

    let update = if status == TransactionStatus::Completed {
        let pending = state
            .store
            .find_pending(&hash, &refcode)
            .await?
            .ok_or_else(not_found)?;
        // Only a row nobody is spending can be completed from outside.
        let transaction = state
            .store
            .promote_pending(pending.id, TransactionStatus::Pending, false)
            .await?;
        tracing::info!(id = %transaction.id, "Pending transaction promoted");
        PendingUpdate::Promoted(transaction)
    } else {
        let pending = state
            .store
            .update_pending_status(&hash, &refcode, status)
            .await?
            .ok_or_else(not_found)?;
        tracing::info!(id = %pending.id, status = %pending.status, "Pending transaction updated");
        PendingUpdate::Updated(pending)
    };

    Ok(Json(SuccessResponse::new(update)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn body() -> StorePendingRequest {
        StorePendingRequest {
            hash: Some("0xabc".to_string()),
            refcode: Some("REF1".to_string()),
            wallet_address: Some("0x0456".to_string()),
            amount: Some(Decimal::new(1500, 0)),
            stark_amount: Some(Decimal::new(25, 1)),
            txn_type: Some("airtime_purchase".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn complete_body_defaults_to_pending() {
        let new = NewPendingTransaction::try_from(body()).unwrap();
        assert_eq!(new.status, TransactionStatus::Pending);
        assert_eq!(new.txn_type, TransactionType::AirtimePurchase);
    }

    #[test]
    fn each_required_field_is_enforced() {
        let cases: Vec<fn(&mut StorePendingRequest)> = vec![
            |b| b.hash = None,
            |b| b.refcode = Some(" ".to_string()),
            |b| b.wallet_address = None,
            |b| b.amount = None,
            |b| b.stark_amount = None,
            |b| b.txn_type = None,
        ];

        for strip in cases {
            let mut b = body();
            strip(&mut b);
            let err = NewPendingTransaction::try_from(b).unwrap_err();
            assert!(matches!(err, PaystrataError::Validation(msg) if msg == "Missing required fields"));
        }
    }

    #[test]
    fn unknown_txn_type_is_rejected() {
        let mut b = body();
        b.txn_type = Some("lottery".to_string());
        assert!(matches!(
            NewPendingTransaction::try_from(b),
            Err(PaystrataError::Validation(_))
        ));
    }
}
