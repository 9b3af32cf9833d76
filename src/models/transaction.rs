use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    AirtimePurchase,
    DataPurchase,
    CablePayment,
    UtilityPayment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::AirtimePurchase => "airtime_purchase",
            TransactionType::DataPurchase => "data_purchase",
            TransactionType::CablePayment => "cable_payment",
            TransactionType::UtilityPayment => "utility_payment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "airtime_purchase" => Ok(TransactionType::AirtimePurchase),
            "data_purchase" => Ok(TransactionType::DataPurchase),
            "cable_payment" => Ok(TransactionType::CablePayment),
            "utility_payment" => Ok(TransactionType::UtilityPayment),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Lifecycle of a payment record.
///
/// Pending rows start at `Pending` and move to exactly one terminal state.
/// `Success` and `Completed` are both terminal successes: the former is what
/// the transactions table stores, the latter what settlement confirmations
/// send for the pending table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Success,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Success => "success",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransactionStatus::Success)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "processing" => Ok(TransactionStatus::Processing),
            "success" => Ok(TransactionStatus::Success),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub txn_type: TransactionType,
    pub wallet_address: String,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub hash: Option<String>,
    pub refcode: Option<String>,
    pub phone_number: Option<String>,
    pub iuc_number: Option<String>,
    pub meter_number: Option<String>,
    pub network: Option<String>,
    pub stark_amount: Option<Decimal>,
    pub refunded: bool,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingTransaction {
    pub id: Uuid,
    pub amount: Decimal,
    #[sqlx(try_from = "String")]
    pub txn_type: TransactionType,
    pub wallet_address: String,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub hash: Option<String>,
    pub refcode: Option<String>,
    pub phone_number: Option<String>,
    pub iuc_number: Option<String>,
    pub meter_number: Option<String>,
    pub network: Option<String>,
    pub stark_amount: Option<Decimal>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/pending-transactions`.
///
/// Every field is optional on the wire so that missing fields surface as a
/// validation error instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorePendingRequest {
    pub hash: Option<String>,
    pub refcode: Option<String>,
    pub wallet_address: Option<String>,
    pub amount: Option<Decimal>,
    pub stark_amount: Option<Decimal>,
    pub txn_type: Option<String>,
    pub status: Option<String>,
    pub phone_number: Option<String>,
    pub iuc_number: Option<String>,
    pub meter_number: Option<String>,
    pub network: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPendingTransaction {
    pub hash: String,
    pub refcode: String,
    pub wallet_address: String,
    pub amount: Decimal,
    pub stark_amount: Decimal,
    pub txn_type: TransactionType,
    pub status: TransactionStatus,
    pub phone_number: Option<String>,
    pub iuc_number: Option<String>,
    pub meter_number: Option<String>,
    pub network: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePendingRequest {
    pub hash: Option<String>,
    pub refcode: Option<String>,
    pub status: Option<String>,
}

/// Which store the verification gate found the settlement in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementKind {
    Pending,
    Completed,
}

impl SettlementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementKind::Pending => "pending",
            SettlementKind::Completed => "completed",
        }
    }
}

/// A settlement that passed the verification gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTransaction {
    pub id: Uuid,
    pub kind: SettlementKind,
}
