//! Per (date, hour) operational metrics derived from generated transactions.

use crate::{
    stats,
    transaction_generator::{round_to, Transaction},
    types::{OperationType, TxnStatus},
};
use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyMetric {
    pub date: NaiveDate,
    pub hour: u32,
    pub txn_count: i64,
    pub success_count: i64,
    pub failed_count: i64,
    pub active_users: i64,
    pub mean_processing_seconds: f64,
    pub median_processing_seconds: f64,
    pub p95_processing_seconds: f64,
    pub max_processing_seconds: i64,
    pub error_rate_pct: f64,
    pub manual_validation_rate_pct: f64,
    pub fraud_rate_pct: f64,
    pub total_volume_usd: f64,
    pub mean_volume_usd: f64,
    pub total_fees_usd: f64,
    pub buy_count: i64,
    pub sell_count: i64,
    pub swap_count: i64,
    pub withdrawal_count: i64,
}

/// Group transactions by (start date, start hour), ascending.
pub fn aggregate_hourly(txns: &[Transaction]) -> Vec<HourlyMetric> {
    let mut buckets: BTreeMap<(NaiveDate, u32), Vec<&Transaction>> = BTreeMap::new();
    for t in txns {
        buckets
            .entry((t.started_at.date(), t.started_at.hour()))
            .or_default()
            .push(t);
    }

    let metrics: Vec<HourlyMetric> = buckets
        .into_iter()
        .map(|((date, hour), group)| summarize(date, hour, &group))
        .collect();
    log::info!("{} hourly metric rows", metrics.len());
    metrics
}

fn summarize(date: NaiveDate, hour: u32, group: &[&Transaction]) -> HourlyMetric {
    let n = group.len();
    let times: Vec<f64> = group.iter().map(|t| t.processing_seconds as f64).collect();
    let users: HashSet<i64> = group.iter().map(|t| t.user_id).collect();
    let count = |pred: &dyn Fn(&Transaction) -> bool| group.iter().filter(|t| pred(t)).count();

    let success = count(&|t| t.status == TxnStatus::Success);
    let failed = count(&|t| t.status == TxnStatus::Failed);
    let manual = count(&|t| t.requires_manual_validation);
    let fraud = count(&|t| t.fraud_flagged);
    let by_op = |op: OperationType| count(&|t| t.operation_type == op) as i64;

    let total_volume: f64 = group.iter().map(|t| t.amount_usd).sum();

    HourlyMetric {
        date,
        hour,
        txn_count: n as i64,
        success_count: success as i64,
        failed_count: failed as i64,
        active_users: users.len() as i64,
        mean_processing_seconds: stats::mean(&times).unwrap_or(0.0),
        median_processing_seconds: stats::median(&times).unwrap_or(0.0),
        p95_processing_seconds: stats::quantile(&times, 0.95).unwrap_or(0.0),
        max_processing_seconds: group.iter().map(|t| t.processing_seconds).max().unwrap_or(0),
        error_rate_pct: round_to(stats::pct(failed, n), 2),
        manual_validation_rate_pct: round_to(stats::pct(manual, n), 2),
        fraud_rate_pct: round_to(stats::pct(fraud, n), 2),
        total_volume_usd: round_to(total_volume, 2),
        mean_volume_usd: if n == 0 { 0.0 } else { total_volume / n as f64 },
        total_fees_usd: round_to(group.iter().map(|t| t.fee_usd).sum(), 2),
        buy_count: by_op(OperationType::Buy),
        sell_count: by_op(OperationType::Sell),
        swap_count: by_op(OperationType::Swap),
        withdrawal_count: by_op(OperationType::Withdrawal),
    }
}
