//! Bottleneck analyses over hand-built rows.

use chrono::NaiveDate;
use cryptoops_core::{
    analysis::bottlenecks::{
        analyze_bottlenecks, manual_validation, payment_methods, peak_hour, slow_transactions,
        REPORT_FILE,
    },
    config::AnalyzerConfig,
    store::AnalysisRow,
    types::{Crypto, OperationType, PaymentMethod, TxnStatus, VerificationLevel},
};
use tempfile::TempDir;

fn row(id: i64, hour: u32, seconds: i64) -> AnalysisRow {
    AnalysisRow {
        transaction_id: id,
        user_id: 1,
        operation_type: OperationType::Buy,
        crypto: Crypto::Btc,
        amount_usd: 250.0,
        fee_usd: 1.25,
        started_at: NaiveDate::from_ymd_opt(2024, 8, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap(),
        processing_seconds: seconds,
        status: TxnStatus::Success,
        failure_reason: None,
        requires_manual_validation: false,
        payment_method: PaymentMethod::BankTransfer,
        fraud_score: 10.0,
        verification_level: VerificationLevel::Intermediate,
    }
}

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn peak_hour_measures_time_lost_at_peak() {
    let rows = vec![row(1, 9, 60), row(2, 10, 60), row(3, 19, 120), row(4, 22, 120)];
    let analysis = peak_hour(&rows);
    assert_eq!(analysis.table.len(), 2);
    assert_eq!(analysis.finding.affected_transactions, 2);
    assert!(near(analysis.finding.wasted_hours, 120.0 / 3600.0));
    assert_eq!(analysis.finding.estimated_impact_pct, 25);
    assert!(analysis.highlights[0].contains("100.0% slower"));
}

#[test]
fn peak_hour_without_peak_rows_is_a_zero_finding() {
    let rows = vec![row(1, 9, 60), row(2, 10, 80)];
    let analysis = peak_hour(&rows);
    assert_eq!(analysis.table.len(), 1);
    assert_eq!(analysis.finding.affected_transactions, 0);
    assert_eq!(analysis.finding.wasted_hours, 0.0);
}

#[test]
fn manual_validation_counts_extra_time_of_flagged_rows() {
    let mut flagged = row(3, 12, 200);
    flagged.requires_manual_validation = true;
    flagged.amount_usd = 8_000.0;
    let rows = vec![row(1, 9, 50), row(2, 10, 50), flagged];
    let analysis = manual_validation(&rows);
    assert_eq!(analysis.finding.affected_transactions, 1);
    assert!(near(analysis.finding.wasted_hours, 150.0 / 3600.0));
    assert_eq!(analysis.finding.estimated_impact_pct, 30);
    assert!(analysis.highlights.iter().any(|h| h.contains("$8000.00")));
}

#[test]
fn manual_validation_without_flagged_rows_is_a_zero_finding() {
    let rows = vec![row(1, 9, 50), row(2, 10, 70)];
    let finding = manual_validation(&rows).finding;
    assert_eq!(finding.affected_transactions, 0);
    assert_eq!(finding.wasted_hours, 0.0);
}

#[test]
fn payment_methods_names_the_slowest_method() {
    let mut card_a = row(3, 12, 100);
    card_a.payment_method = PaymentMethod::Card;
    let mut card_b = row(4, 13, 100);
    card_b.payment_method = PaymentMethod::Card;
    let rows = vec![row(1, 9, 40), row(2, 10, 40), card_a, card_b];
    let analysis = payment_methods(&rows);
    assert_eq!(analysis.finding.name, "Payment Method: card");
    assert_eq!(analysis.finding.affected_transactions, 2);
    assert!(near(analysis.finding.wasted_hours, 120.0 / 3600.0));
    assert_eq!(analysis.table.cell(0, "payment_method"), Some("card"));
}

#[test]
fn slow_transactions_measure_time_above_the_overall_mean() {
    let rows = vec![row(1, 20, 400), row(2, 9, 100), row(3, 10, 100), row(4, 11, 100)];
    let analysis = slow_transactions(&rows, 300);
    assert_eq!(analysis.finding.affected_transactions, 1);
    // overall mean 175 s, one slow row of 400 s
    assert!(near(analysis.finding.wasted_hours, 225.0 / 3600.0));
    assert!(analysis.highlights.iter().any(|h| h.contains("Peak Hour")));
    assert_eq!(analysis.table.len(), 1);
}

#[test]
fn consolidated_report_is_sorted_by_impact_and_exported() {
    let mut flagged = row(5, 21, 500);
    flagged.requires_manual_validation = true;
    let rows = vec![row(1, 9, 60), row(2, 10, 60), row(3, 19, 120), row(4, 22, 120), flagged];
    let report = analyze_bottlenecks(&rows, &AnalyzerConfig::default());
    let impacts: Vec<u32> = report.findings.iter().map(|f| f.estimated_impact_pct).collect();
    assert_eq!(impacts, vec![30, 25, 20, 15]);
    let total: f64 = report.findings.iter().map(|f| f.wasted_hours).sum();
    assert!(near(report.total_wasted_hours, total));

    let dir = TempDir::new().unwrap();
    let path = report.export(dir.path()).unwrap();
    assert_eq!(path, dir.path().join(REPORT_FILE));
    let csv = std::fs::read_to_string(path).unwrap();
    assert!(csv.starts_with("name,affected_transactions,wasted_hours,estimated_impact_pct"));
    assert_eq!(csv.lines().count(), 5);
}

#[test]
fn empty_input_never_fails() {
    let report = analyze_bottlenecks(&[], &AnalyzerConfig::default());
    assert_eq!(report.findings.len(), 4);
    assert!(report.findings.iter().all(|f| f.affected_transactions == 0));
    assert_eq!(report.total_wasted_hours, 0.0);
}
