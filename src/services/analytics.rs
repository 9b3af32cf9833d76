use crate::{
    error::PaystrataError,
    models::{
        ActivityKind, Analytics, PageRequest, PendingTransaction, RecentActivity, Refund,
        Transaction,
    },
    services::store::Store,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// How many rows of each kind the dashboard aggregates over.
pub const ANALYTICS_WINDOW: u32 = 1000;
const ACTIVITY_PER_KIND: u32 = 5;
const ACTIVITY_LIMIT: usize = 10;

pub struct AnalyticsService {
    store: Arc<dyn Store>,
    profit_margin: Decimal,
    start_time: Instant,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn Store>, profit_margin: Decimal) -> Self {
        Self {
            store,
            profit_margin,
            start_time: Instant::now(),
        }
    }

    pub async fn summary(&self) -> Result<Analytics, PaystrataError> {
        let window = PageRequest::new(1, ANALYTICS_WINDOW);
        let (transactions, _) = self.store.list_transactions(window).await?;
        let (pending, _) = self.store.list_pending(window).await?;
        let (refunds, _) = self.store.list_refunds(window).await?;

        Ok(summarize(
            &transactions,
            pending.len() as u64,
            refunds.len() as u64,
            self.profit_margin,
        ))
    }

    pub async fn recent_activity(&self) -> Result<Vec<RecentActivity>, PaystrataError> {
        let latest = PageRequest::new(1, ACTIVITY_PER_KIND);
        let (transactions, _) = self.store.list_transactions(latest).await?;
        let (pending, _) = self.store.list_pending(latest).await?;
        let (refunds, _) = self.store.list_refunds(latest).await?;

        Ok(merge_activity(&transactions, &pending, &refunds))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Dashboard figures. Amounts only count transactions with status `success`.
pub fn summarize(
    transactions: &[Transaction],
    pending_count: u64,
    refund_count: u64,
    profit_margin: Decimal,
) -> Analytics {
    let total_transactions = transactions.len() as u64;
    let successful: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| tx.status.is_success())
        .collect();

    let total_amount: Decimal = successful.iter().map(|tx| tx.amount).sum();
    let average_transaction_amount = if successful.is_empty() {
        Decimal::ZERO
    } else {
        total_amount / Decimal::from(successful.len())
    };
    let success_rate = if total_transactions > 0 {
        round_to(
            successful.len() as f64 / total_transactions as f64 * 100.0,
            1,
        )
    } else {
        0.0
    };
    let total_users = transactions
        .iter()
        .map(|tx| tx.wallet_address.as_str())
        .filter(|address| !address.is_empty())
        .collect::<HashSet<_>>()
        .len() as u64;

    Analytics {
        total_transactions,
        total_amount: total_amount.round_dp(2),
        total_profit: (total_amount * profit_margin).round_dp(2),
        average_transaction_amount: average_transaction_amount.round_dp(2),
        success_rate,
        total_users,
        pending_transactions: pending_count,
        total_refunds: refund_count,
    }
}

/// Formats an amount the way the dashboard shows naira, e.g. `NGN 1,500.00`.
pub fn format_naira(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let cents = (rounded.abs() * Decimal::ONE_HUNDRED).to_u128().unwrap_or(0);
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!(
        "{}NGN {}.{:02}",
        if negative { "-" } else { "" },
        grouped,
        fraction
    )
}

fn describe(amount: Decimal, txn_type: &str, network: Option<&str>) -> String {
    let amount = format_naira(amount);
    let network = network
        .filter(|n| !n.is_empty())
        .map(|n| format!(" ({})", n))
        .unwrap_or_default();

    match txn_type.to_lowercase().as_str() {
        "airtime_purchase" => format!("{} airtime purchase{}", amount, network),
        "data_purchase" => format!("{} data purchase{}", amount, network),
        "cable_payment" => format!("{} cable payment{}", amount, network),
        "utility_payment" => format!("{} utility payment{}", amount, network),
        "" => format!("{} transaction", amount),
        other => format!("{} {}", amount, other.replacen('_', " ", 1)),
    }
}

/// Latest activity across the three tables, newest first.
pub fn merge_activity(
    transactions: &[Transaction],
    pending: &[PendingTransaction],
    refunds: &[Refund],
) -> Vec<RecentActivity> {
    let mut activities: Vec<RecentActivity> = transactions
        .iter()
        .map(|tx| RecentActivity {
            id: tx.id,
            kind: ActivityKind::Transaction,
            status: tx.status.to_string(),
            amount: tx.amount,
            description: describe(tx.amount, tx.txn_type.as_str(), tx.network.as_deref()),
            txn_type: Some(tx.txn_type.to_string()),
            network: tx.network.clone(),
            phone_number: tx.phone_number.clone(),
            created_at: tx.created_at,
            refcode: tx.refcode.clone(),
        })
        .chain(pending.iter().map(|tx| RecentActivity {
            id: tx.id,
            kind: ActivityKind::PendingTransaction,
            status: tx.status.to_string(),
            amount: tx.amount,
            description: describe(tx.amount, tx.txn_type.as_str(), tx.network.as_deref()),
            txn_type: Some(tx.txn_type.to_string()),
            network: tx.network.clone(),
            phone_number: tx.phone_number.clone(),
            created_at: tx.created_at,
            refcode: tx.refcode.clone(),
        }))
        .chain(refunds.iter().map(|refund| RecentActivity {
            id: refund.id,
            kind: ActivityKind::Refund,
            status: refund.status.to_string(),
            amount: refund.amount,
            description: format!("Refund {}", refund.status),
            txn_type: None,
            network: None,
            phone_number: None,
            created_at: refund.created_at,
            refcode: None,
        }))
        .collect();

    activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    activities.truncate(ACTIVITY_LIMIT);
    activities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RefundStatus, TransactionStatus, TransactionType};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn tx(amount: i64, status: TransactionStatus, wallet: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            amount: Decimal::new(amount, 2),
            txn_type: TransactionType::AirtimePurchase,
            wallet_address: wallet.to_string(),
            status,
            hash: None,
            refcode: None,
            phone_number: None,
            iuc_number: None,
            meter_number: None,
            network: Some("MTN".to_string()),
            stark_amount: None,
            refunded: false,
            used: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn totals_only_count_successful_transactions() {
        let transactions = vec![
            tx(100000, TransactionStatus::Success, "0xa"),
            tx(50050, TransactionStatus::Success, "0xb"),
            tx(99999, TransactionStatus::Failed, "0xa"),
        ];

        let analytics = summarize(&transactions, 4, 1, Decimal::new(5, 2));

        assert_eq!(analytics.total_transactions, 3);
        assert_eq!(analytics.total_amount, Decimal::new(150050, 2));
        assert_eq!(analytics.total_profit, Decimal::new(7503, 2));
        assert_eq!(analytics.average_transaction_amount, Decimal::new(75025, 2));
        assert_eq!(analytics.success_rate, 66.7);
        assert_eq!(analytics.total_users, 2);
        assert_eq!(analytics.pending_transactions, 4);
        assert_eq!(analytics.total_refunds, 1);
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let analytics = summarize(&[], 0, 0, Decimal::new(5, 2));
        assert_eq!(analytics, Analytics::default());
    }

    #[test]
    fn success_rate_rounds_to_one_decimal() {
        let mut transactions = vec![tx(100, TransactionStatus::Success, "0xa")];
        transactions.extend((0..5).map(|_| tx(100, TransactionStatus::Failed, "0xa")));
        // 1/6 = 16.666...
        assert_eq!(
            summarize(&transactions, 0, 0, Decimal::ZERO).success_rate,
            16.7
        );
    }

    #[test]
    fn naira_formatting_groups_thousands() {
        assert_eq!(format_naira(Decimal::new(150000, 2)), "NGN 1,500.00");
        assert_eq!(format_naira(Decimal::new(123456789, 2)), "NGN 1,234,567.89");
        assert_eq!(format_naira(Decimal::new(5, 1)), "NGN 0.50");
    }

    #[test]
    fn descriptions_follow_the_transaction_type() {
        assert_eq!(
            describe(Decimal::new(500, 0), "airtime_purchase", Some("MTN")),
            "NGN 500.00 airtime purchase (MTN)"
        );
        assert_eq!(
            describe(Decimal::new(500, 0), "betting_top_up", None),
            "NGN 500.00 betting top_up"
        );
    }

    #[test]
    fn activity_is_merged_newest_first_and_capped() {
        let now = Utc::now();
        let transactions: Vec<Transaction> = (0..5)
            .map(|i| {
                let mut t = tx(100, TransactionStatus::Success, "0xa");
                t.created_at = now - Duration::minutes(i * 2);
                t
            })
            .collect();
        let refunds: Vec<Refund> = (0..5)
            .map(|i| Refund {
                id: Uuid::new_v4(),
                transaction_id: transactions[0].id,
                amount: Decimal::ONE,
                reason: None,
                status: RefundStatus::Pending,
                processed_at: None,
                created_at: now - Duration::minutes(i * 2 + 1),
                updated_at: now,
            })
            .collect();
        let pending = vec![PendingTransaction {
            id: Uuid::new_v4(),
            amount: Decimal::ONE,
            txn_type: TransactionType::DataPurchase,
            wallet_address: "0xc".to_string(),
            status: TransactionStatus::Pending,
            hash: None,
            refcode: None,
            phone_number: None,
            iuc_number: None,
            meter_number: None,
            network: None,
            stark_amount: None,
            completed_at: None,
            created_at: now - Duration::hours(1),
            updated_at: now,
        }];

        let activity = merge_activity(&transactions, &pending, &refunds);

        assert_eq!(activity.len(), ACTIVITY_LIMIT);
        assert!(activity.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(activity[0].kind, ActivityKind::Transaction);
        assert_eq!(activity[1].kind, ActivityKind::Refund);
        assert_eq!(activity[1].description, "Refund pending");
        assert!(activity.iter().all(|a| a.kind != ActivityKind::PendingTransaction));
    }
}
