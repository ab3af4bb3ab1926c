//! Optimization simulations: automatic validation, peak prioritization
//! and the projected time reduction.

use chrono::NaiveDate;
use cryptoops_core::{
    config::AnalyzerConfig,
    optimizer::{
        simulation::{project, COMPARISON_FILE, PROPOSALS_FILE},
        AutoValidator, PeakPrioritizer, Priority, ValidationOutcome,
    },
    store::AnalysisRow,
    types::{Crypto, OperationType, PaymentMethod, TxnStatus, VerificationLevel},
};
use tempfile::TempDir;

fn row(id: i64, hour: u32, amount: f64, level: VerificationLevel) -> AnalysisRow {
    AnalysisRow {
        transaction_id: id,
        user_id: 1,
        operation_type: OperationType::Sell,
        crypto: Crypto::Eth,
        amount_usd: amount,
        fee_usd: amount * 0.005,
        started_at: NaiveDate::from_ymd_opt(2024, 9, 2)
            .unwrap()
            .and_hms_opt(hour, 15, 0)
            .unwrap(),
        processing_seconds: 200,
        status: TxnStatus::Success,
        failure_reason: None,
        requires_manual_validation: amount > 5_000.0,
        payment_method: PaymentMethod::BankTransfer,
        fraud_score: 12.0,
        verification_level: level,
    }
}

#[test]
fn prioritizer_assigns_queues_by_amount_and_level() {
    assert_eq!(
        PeakPrioritizer::assign(&row(1, 19, 6_000.0, VerificationLevel::Basic)),
        Priority::High
    );
    assert_eq!(
        PeakPrioritizer::assign(&row(2, 19, 50.0, VerificationLevel::Full)),
        Priority::High
    );
    assert_eq!(
        PeakPrioritizer::assign(&row(3, 19, 50.0, VerificationLevel::Basic)),
        Priority::Low
    );
    assert_eq!(
        PeakPrioritizer::assign(&row(4, 19, 100.0, VerificationLevel::Basic)),
        Priority::Normal
    );
    assert_eq!(
        PeakPrioritizer::assign(&row(5, 19, 500.0, VerificationLevel::Intermediate)),
        Priority::Normal
    );
}

#[test]
fn prioritizer_estimates_queue_time() {
    let rows = vec![
        row(1, 19, 6_000.0, VerificationLevel::Full),
        row(2, 20, 500.0, VerificationLevel::Intermediate),
        row(3, 21, 900.0, VerificationLevel::Intermediate),
        row(4, 22, 20.0, VerificationLevel::Basic),
    ];
    let mut prioritizer = PeakPrioritizer::new();
    let summary = prioritizer.process(&rows);
    assert_eq!((summary.high, summary.normal, summary.low), (1, 2, 1));
    assert_eq!(summary.estimated_seconds, 30 + 2 * 45 + 60);
    assert_eq!(prioritizer.queue(Priority::Normal), &[2, 3]);
}

#[test]
fn validator_routes_risky_rows_to_manual_review() {
    let mut validator = AutoValidator::new(AnalyzerConfig::default().validator);
    let mut card = row(1, 10, 7_000.0, VerificationLevel::Full);
    card.payment_method = PaymentMethod::Card;
    let mut risky = row(2, 10, 7_000.0, VerificationLevel::Full);
    risky.fraud_score = 55.0;
    let big = row(3, 10, 25_000.0, VerificationLevel::Full);
    let fine = row(4, 10, 7_000.0, VerificationLevel::Intermediate);

    let decisions = validator.process_batch([&card, &risky, &big, &fine]);
    let outcomes: Vec<ValidationOutcome> = decisions.iter().map(|d| d.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            ValidationOutcome::ManualReview,
            ValidationOutcome::ManualReview,
            ValidationOutcome::ManualReview,
            ValidationOutcome::Approved,
        ]
    );
    assert!(decisions[0].reason.contains("card"));
    assert!(decisions[1].reason.contains("fraud score"));
    assert!(decisions[2].reason.contains("automatic limit"));

    let stats = validator.stats();
    assert_eq!((stats.processed, stats.auto_approved, stats.manual_review), (4, 1, 3));
    assert_eq!(stats.auto_rejected, 0);
    assert_eq!(stats.seconds_saved, 295);
    assert!((stats.automation_rate() - 0.25).abs() < 1e-12);
}

#[test]
fn projection_scales_with_automation_rate() {
    let config = AnalyzerConfig::default();
    // Two flagged rows, both approved; two unflagged peak rows.
    let sample = vec![
        row(1, 10, 6_000.0, VerificationLevel::Full),
        row(2, 11, 8_000.0, VerificationLevel::Intermediate),
        row(3, 19, 300.0, VerificationLevel::Basic),
        row(4, 20, 40.0, VerificationLevel::Basic),
    ];
    let result = project(&sample, &config);
    assert_eq!(result.sample_size, 4);
    assert_eq!(result.manual_candidates, 2);
    assert_eq!(result.validator.auto_approved, 2);
    assert!((result.reduction - 0.35).abs() < 1e-12);
    assert!((result.mean_seconds_before - 200.0).abs() < 1e-9);
    assert!((result.mean_seconds_after - 130.0).abs() < 1e-9);
    assert!((result.saved_hours() - 800.0 * 0.35 / 3600.0).abs() < 1e-9);

    assert_eq!(result.peak_transactions, 2);
    let queues = result.queues.clone().unwrap();
    assert_eq!((queues.high, queues.normal, queues.low), (0, 1, 1));

    assert_eq!(result.comparison.len(), 4);
    assert_eq!(result.proposals.len(), 5);
    assert_eq!(result.comparison.cell(3, "after"), Some("35"));
}

#[test]
fn projection_without_flagged_rows_uses_the_baseline() {
    let config = AnalyzerConfig::default();
    let sample = vec![
        row(1, 10, 300.0, VerificationLevel::Basic),
        row(2, 11, 400.0, VerificationLevel::Intermediate),
    ];
    let result = project(&sample, &config);
    assert!(result.decisions.is_empty());
    assert_eq!(result.validator.processed, 0);
    assert!((result.reduction - 0.22).abs() < 1e-12);
    assert!(result.queues.is_none());
}

#[test]
fn export_writes_comparison_and_proposals() {
    let sample = vec![row(1, 19, 6_000.0, VerificationLevel::Full)];
    let result = project(&sample, &AnalyzerConfig::default());
    let dir = TempDir::new().unwrap();
    let written = result.export(dir.path()).unwrap();
    assert_eq!(
        written,
        vec![dir.path().join(COMPARISON_FILE), dir.path().join(PROPOSALS_FILE)]
    );
    let proposals = std::fs::read_to_string(&written[1]).unwrap();
    assert!(proposals.contains("Automatic Validation"));
}
