//! Bottleneck analyses: where processing time is lost and how much.
//!
//! RULE: A missing comparison group never fails an analysis. It yields a
//! zero finding and a warning.

use crate::{
    config::AnalyzerConfig,
    error::OpsResult,
    report::{fmt2, ReportTable},
    stats,
    store::AnalysisRow,
    types::{PaymentMethod, Period},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "bottleneck_report.csv";

/// One row of the consolidated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub name: String,
    pub affected_transactions: i64,
    pub wasted_hours: f64,
    pub estimated_impact_pct: u32,
}

impl Finding {
    fn zero(name: impl Into<String>, estimated_impact_pct: u32) -> Self {
        Self {
            name: name.into(),
            affected_transactions: 0,
            wasted_hours: 0.0,
            estimated_impact_pct,
        }
    }
}

/// The detail produced by one analysis.
#[derive(Debug, Clone)]
pub struct BottleneckAnalysis {
    pub table: ReportTable,
    pub highlights: Vec<String>,
    pub finding: Finding,
}

#[derive(Debug, Clone)]
pub struct BottleneckReport {
    pub analyses: Vec<BottleneckAnalysis>,
    /// Findings sorted by estimated impact, highest first.
    pub findings: Vec<Finding>,
    pub total_wasted_hours: f64,
}

impl BottleneckReport {
    pub fn summary_table(&self) -> ReportTable {
        let mut table = ReportTable::new(
            "Bottleneck Summary",
            ["name", "affected_transactions", "wasted_hours", "estimated_impact_pct"],
        );
        for f in &self.findings {
            table.push([
                f.name.clone(),
                f.affected_transactions.to_string(),
                fmt2(f.wasted_hours),
                f.estimated_impact_pct.to_string(),
            ]);
        }
        table
    }

    pub fn export(&self, dir: &Path) -> OpsResult<PathBuf> {
        self.summary_table().write_csv(&dir.join(REPORT_FILE))
    }
}

/// Timing stats of one group of rows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroupStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub error_rate_pct: f64,
}

impl GroupStats {
    pub fn of(rows: &[&AnalysisRow]) -> Self {
        let times: Vec<f64> = rows.iter().map(|r| r.processing_seconds as f64).collect();
        let failed = rows.iter().filter(|r| r.is_failed()).count();
        Self {
            count: rows.len(),
            mean: stats::mean(&times).unwrap_or(0.0),
            median: stats::median(&times).unwrap_or(0.0),
            p95: stats::quantile(&times, 0.95).unwrap_or(0.0),
            error_rate_pct: stats::pct(failed, rows.len()),
        }
    }
}

/// Run the four analyses and consolidate them.
pub fn analyze_bottlenecks(rows: &[AnalysisRow], config: &AnalyzerConfig) -> BottleneckReport {
    let analyses = vec![
        peak_hour(rows),
        manual_validation(rows),
        payment_methods(rows),
        slow_transactions(rows, config.slow_threshold_seconds),
    ];
    let mut findings: Vec<Finding> = analyses.iter().map(|a| a.finding.clone()).collect();
    findings.sort_by(|a, b| b.estimated_impact_pct.cmp(&a.estimated_impact_pct));
    let total_wasted_hours = findings.iter().map(|f| f.wasted_hours).sum();
    log::info!(
        "{} bottlenecks, {:.1} wasted hours in total",
        findings.len(),
        total_wasted_hours
    );
    BottleneckReport {
        analyses,
        findings,
        total_wasted_hours,
    }
}

// ── Peak hour ──────────────────────────────────────────────────────

pub fn peak_hour(rows: &[AnalysisRow]) -> BottleneckAnalysis {
    const NAME: &str = "Peak Hour (18-23h)";
    const IMPACT: u32 = 25;

    let settled: Vec<&AnalysisRow> = rows.iter().filter(|r| r.is_settled()).collect();
    let mut table = ReportTable::new(
        "Peak vs Normal Hour",
        ["period", "mean_seconds", "median_seconds", "p95_seconds", "txn_count", "error_rate_pct"],
    );
    let mut by_period: BTreeMap<Period, GroupStats> = BTreeMap::new();
    for period in Period::ALL {
        let group: Vec<&AnalysisRow> = settled.iter().copied().filter(|r| r.period() == *period).collect();
        if group.is_empty() {
            continue;
        }
        let s = GroupStats::of(&group);
        table.push([
            period.to_string(),
            fmt2(s.mean),
            fmt2(s.median),
            fmt2(s.p95),
            s.count.to_string(),
            fmt2(s.error_rate_pct),
        ]);
        by_period.insert(*period, s);
    }

    let (Some(peak), Some(normal)) = (by_period.get(&Period::Peak), by_period.get(&Period::Normal)) else {
        log::warn!("peak-hour analysis needs both periods, found {}", by_period.len());
        return BottleneckAnalysis {
            table,
            highlights: vec!["Not enough data to compare peak and normal hours".into()],
            finding: Finding::zero(NAME, IMPACT),
        };
    };

    let slowdown_pct = if normal.mean > 0.0 {
        (peak.mean / normal.mean - 1.0) * 100.0
    } else {
        0.0
    };
    let wasted_seconds = (peak.mean - normal.mean) * peak.count as f64;
    BottleneckAnalysis {
        table,
        highlights: vec![
            format!("Mean time {slowdown_pct:.1}% slower at peak hour"),
            format!(
                "Error rate {:.2}% vs {:.2}%",
                peak.error_rate_pct, normal.error_rate_pct
            ),
            format!("{} transactions affected", peak.count),
            format!("Impact: {:.1} hours wasted at peak hour", wasted_seconds / 3600.0),
        ],
        finding: Finding {
            name: NAME.into(),
            affected_transactions: peak.count as i64,
            wasted_hours: wasted_seconds / 3600.0,
            estimated_impact_pct: IMPACT,
        },
    }
}

// ── Manual validation ──────────────────────────────────────────────

pub fn manual_validation(rows: &[AnalysisRow]) -> BottleneckAnalysis {
    const NAME: &str = "Manual Validation";
    const IMPACT: u32 = 30;

    let mut table = ReportTable::new(
        "Manual Validation",
        ["requires_manual_validation", "txn_count", "mean_seconds", "mean_amount_usd", "share_pct"],
    );
    let mut groups: BTreeMap<bool, (usize, f64, f64)> = BTreeMap::new();
    for flag in [false, true] {
        let group: Vec<&AnalysisRow> = rows
            .iter()
            .filter(|r| r.requires_manual_validation == flag)
            .collect();
        if group.is_empty() {
            continue;
        }
        let times: Vec<f64> = group.iter().map(|r| r.processing_seconds as f64).collect();
        let amounts: Vec<f64> = group.iter().map(|r| r.amount_usd).collect();
        let mean_time = stats::mean(&times).unwrap_or(0.0);
        let mean_amount = stats::mean(&amounts).unwrap_or(0.0);
        table.push([
            flag.to_string(),
            group.len().to_string(),
            fmt2(mean_time),
            fmt2(mean_amount),
            fmt2(stats::pct(group.len(), rows.len())),
        ]);
        groups.insert(flag, (group.len(), mean_time, mean_amount));
    }

    let (Some(&(flagged_n, flagged_time, flagged_amount)), Some(&(_, plain_time, _))) =
        (groups.get(&true), groups.get(&false))
    else {
        log::warn!("manual-validation analysis needs flagged and unflagged rows");
        return BottleneckAnalysis {
            table,
            highlights: vec!["Not enough data to compare manual and automatic validation".into()],
            finding: Finding::zero(NAME, IMPACT),
        };
    };

    let extra = flagged_time - plain_time;
    let wasted_seconds = extra * flagged_n as f64;
    BottleneckAnalysis {
        table,
        highlights: vec![
            format!(
                "{:.1}% of transactions require manual validation",
                stats::pct(flagged_n, rows.len())
            ),
            format!("Extra time: {extra:.0} seconds per transaction"),
            format!("Mean amount: ${flagged_amount:.2}"),
            format!("Impact: {:.1} hours spent on manual validation", wasted_seconds / 3600.0),
        ],
        finding: Finding {
            name: NAME.into(),
            affected_transactions: flagged_n as i64,
            wasted_hours: wasted_seconds / 3600.0,
            estimated_impact_pct: IMPACT,
        },
    }
}

// ── Payment methods ────────────────────────────────────────────────

pub fn payment_methods(rows: &[AnalysisRow]) -> BottleneckAnalysis {
    const IMPACT: u32 = 15;

    let settled: Vec<&AnalysisRow> = rows.iter().filter(|r| r.is_settled()).collect();
    let mut per_method: Vec<(PaymentMethod, GroupStats)> = PaymentMethod::ALL
        .iter()
        .filter_map(|m| {
            let group: Vec<&AnalysisRow> =
                settled.iter().copied().filter(|r| r.payment_method == *m).collect();
            (!group.is_empty()).then(|| (*m, GroupStats::of(&group)))
        })
        .collect();
    per_method.sort_by(|a, b| b.1.mean.total_cmp(&a.1.mean));

    let mut table = ReportTable::new(
        "Payment Methods",
        ["payment_method", "txn_count", "mean_seconds", "error_rate_pct"],
    );
    for (m, s) in &per_method {
        table.push([
            m.to_string(),
            s.count.to_string(),
            fmt2(s.mean),
            fmt2(s.error_rate_pct),
        ]);
    }

    let (Some((slow_method, slow)), Some((fast_method, fast))) = (per_method.first(), per_method.last())
    else {
        log::warn!("payment-method analysis found no settled transactions");
        return BottleneckAnalysis {
            table,
            highlights: vec!["No settled transactions to compare payment methods".into()],
            finding: Finding::zero("Payment Method: n/a", IMPACT),
        };
    };

    let diff = slow.mean - fast.mean;
    let wasted_seconds = diff * slow.count as f64;
    BottleneckAnalysis {
        highlights: vec![
            format!("Slowest method: {slow_method} ({:.0}s)", slow.mean),
            format!("Fastest method: {fast_method} ({:.0}s)", fast.mean),
            format!("Difference: {diff:.0}s per transaction"),
            format!("Impact: {:.1} hours of overhead on the slowest method", wasted_seconds / 3600.0),
        ],
        finding: Finding {
            name: format!("Payment Method: {slow_method}"),
            affected_transactions: slow.count as i64,
            wasted_hours: wasted_seconds / 3600.0,
            estimated_impact_pct: IMPACT,
        },
        table,
    }
}

// ── Slow transactions ──────────────────────────────────────────────

pub fn slow_transactions(rows: &[AnalysisRow], threshold_seconds: i64) -> BottleneckAnalysis {
    const NAME: &str = "Transactions >5min";
    const IMPACT: u32 = 20;

    let slow: Vec<&AnalysisRow> = rows
        .iter()
        .filter(|r| r.processing_seconds > threshold_seconds)
        .collect();

    let mut breakdown: BTreeMap<(Period, bool), usize> = BTreeMap::new();
    for r in &slow {
        *breakdown.entry((r.period(), r.requires_manual_validation)).or_default() += 1;
    }
    let mut table = ReportTable::new(
        "Slow Transactions",
        ["period", "requires_manual_validation", "count"],
    );
    for ((period, manual), n) in &breakdown {
        table.push([period.to_string(), manual.to_string(), n.to_string()]);
    }

    if slow.is_empty() {
        log::warn!("no transactions slower than {threshold_seconds}s");
        return BottleneckAnalysis {
            table,
            highlights: vec![format!("No transactions exceed {threshold_seconds} seconds")],
            finding: Finding::zero(NAME, IMPACT),
        };
    }

    let all_times: Vec<f64> = rows.iter().map(|r| r.processing_seconds as f64).collect();
    let overall_mean = stats::mean(&all_times).unwrap_or(0.0);
    let slow_total: f64 = slow.iter().map(|r| r.processing_seconds as f64).sum();
    let slow_mean = slow_total / slow.len() as f64;
    let recoverable_seconds = slow_total - overall_mean * slow.len() as f64;

    let mut per_period: BTreeMap<Period, usize> = BTreeMap::new();
    for r in &slow {
        *per_period.entry(r.period()).or_default() += 1;
    }
    let dominant = per_period
        .iter()
        .max_by_key(|(_, n)| **n)
        .map(|(p, _)| p.to_string())
        .unwrap_or_default();

    BottleneckAnalysis {
        table,
        highlights: vec![
            format!(
                "{} transactions slower than {threshold_seconds}s ({:.2}% of total)",
                slow.len(),
                stats::pct(slow.len(), rows.len())
            ),
            format!("Mean time of these: {slow_mean:.0}s"),
            format!("Mostly during: {dominant}"),
            format!("Impact: {:.1} hours if normalized", recoverable_seconds / 3600.0),
        ],
        finding: Finding {
            name: NAME.into(),
            affected_transactions: slow.len() as i64,
            wasted_hours: recoverable_seconds / 3600.0,
            estimated_impact_pct: IMPACT,
        },
    }
}
