//! User and transaction generation invariants.

use cryptoops_core::{
    config::{GeneratorConfig, Settings},
    error::OpsError,
    rng::{RngBank, StreamSlot},
    stage::StageContext,
    transaction_generator::{generate_transactions, round_to, Transaction, TxnStreams},
    types::{AccountStatus, OperationType, TxnStatus, VerificationLevel},
    user_generator::{generate_users, User},
};
use std::collections::{HashMap, HashSet};

fn generate(seed: u64) -> (Vec<User>, Vec<Transaction>) {
    let config = GeneratorConfig::default_test();
    let bank = RngBank::new(seed);
    let mut users_rng = bank.for_stream(StreamSlot::Users);
    let mut identity = bank.for_stream(StreamSlot::Identity);
    let mut main = bank.for_stream(StreamSlot::Transactions);
    let mut network = bank.for_stream(StreamSlot::Network);
    let users = generate_users(&config, &mut users_rng, &mut identity);
    let txns = generate_transactions(
        &users,
        &config,
        TxnStreams {
            main: &mut main,
            network: &mut network,
            identity: &mut identity,
        },
    )
    .expect("generate transactions");
    (users, txns)
}

#[test]
fn generates_configured_counts_with_sequential_ids() {
    let config = GeneratorConfig::default_test();
    let (users, txns) = generate(42);
    assert_eq!(users.len(), config.num_users);
    assert_eq!(txns.len(), config.num_transactions);
    assert!(users.iter().enumerate().all(|(i, u)| u.user_id == i as i64 + 1));
    assert!(txns.iter().enumerate().all(|(i, t)| t.transaction_id == i as i64 + 1));
}

#[test]
fn usernames_and_emails_are_unique() {
    let (users, _) = generate(42);
    let usernames: HashSet<&str> = users.iter().map(|u| u.username.as_str()).collect();
    let emails: HashSet<&str> = users.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(usernames.len(), users.len());
    assert_eq!(emails.len(), users.len());
}

#[test]
fn basic_users_are_never_verified() {
    let (users, _) = generate(7);
    for u in &users {
        match u.verification_level {
            VerificationLevel::Basic => assert!(u.last_verified_at.is_none(), "user {}", u.user_id),
            _ => {
                let verified = u.last_verified_at.expect("verified date");
                assert!(verified > u.registered_at);
            }
        }
        assert!(u.country.cities().contains(&u.city.as_str()));
    }
}

#[test]
fn transactions_belong_to_active_users_after_registration() {
    let (users, txns) = generate(42);
    let by_id: HashMap<i64, &User> = users.iter().map(|u| (u.user_id, u)).collect();
    for t in &txns {
        let owner = by_id[&t.user_id];
        assert_eq!(owner.account_status, AccountStatus::Active);
        assert!(t.started_at.date() >= owner.registered_at, "txn {}", t.transaction_id);
    }
}

#[test]
fn amounts_follow_owner_band_and_fee_rate() {
    let config = GeneratorConfig::default_test();
    let (users, txns) = generate(42);
    let by_id: HashMap<i64, &User> = users.iter().map(|u| (u.user_id, u)).collect();
    for t in &txns {
        let band = config.amounts.for_level(by_id[&t.user_id].verification_level);
        assert!(t.amount_usd >= band.min_usd && t.amount_usd <= band.max_usd);
        assert_eq!(t.fee_usd, round_to(t.amount_usd * config.fee_rate, 2));
        assert_eq!(t.total_usd, round_to(t.amount_usd + t.fee_usd, 2));
        assert_eq!(
            t.requires_manual_validation,
            t.amount_usd > config.manual_validation_threshold_usd
        );
        assert!((0.0..=100.0).contains(&t.fraud_score));
        assert_eq!(t.fraud_flagged, t.fraud_score > config.fraud_flag_threshold);
    }
}

#[test]
fn outcome_fields_are_consistent() {
    let config = GeneratorConfig::default_test();
    let (_, txns) = generate(42);
    for t in &txns {
        assert!(t.processing_seconds >= config.timing.min_seconds);
        assert!(t.completed_at > t.started_at);
        match t.status {
            TxnStatus::Success => {
                assert!(t.failure_reason.is_none());
                assert!(t.blockchain_hash.is_some());
                assert!((1..=12).contains(&t.blockchain_confirmations));
                assert_eq!(
                    (t.completed_at - t.started_at).num_seconds(),
                    t.processing_seconds
                );
            }
            TxnStatus::Failed => {
                assert!(t.failure_reason.is_some());
                assert!(t.blockchain_hash.is_none());
                assert_eq!(t.blockchain_confirmations, 0);
            }
            other => panic!("unexpected status {other}"),
        }
        if t.operation_type == OperationType::Swap {
            let target = t.target_crypto.expect("swap target");
            assert_ne!(target, t.crypto);
        } else {
            assert!(t.target_crypto.is_none());
        }
    }
}

#[test]
fn peak_hours_are_overrepresented_and_fail_more() {
    let (_, txns) = generate(42);
    let peak: Vec<&Transaction> = txns.iter().filter(|t| t.period().as_str() == "Peak Hour").collect();
    let normal: Vec<&Transaction> = txns.iter().filter(|t| t.period().as_str() == "Normal Hour").collect();
    // 6 of 24 hours, boosted by the 60% peak share.
    assert!(peak.len() > normal.len());

    let fail_rate = |set: &[&Transaction]| {
        set.iter().filter(|t| t.status == TxnStatus::Failed).count() as f64 / set.len() as f64
    };
    assert!(fail_rate(&peak) > fail_rate(&normal));
}

#[test]
fn no_active_users_is_an_error() {
    let mut config = GeneratorConfig::default_test();
    config.num_users = 5;
    let bank = RngBank::new(1);
    let mut users_rng = bank.for_stream(StreamSlot::Users);
    let mut identity = bank.for_stream(StreamSlot::Identity);
    let mut users = generate_users(&config, &mut users_rng, &mut identity);
    for u in &mut users {
        u.account_status = AccountStatus::Closed;
    }
    let mut main = bank.for_stream(StreamSlot::Transactions);
    let mut network = bank.for_stream(StreamSlot::Network);
    let result = generate_transactions(
        &users,
        &config,
        TxnStreams {
            main: &mut main,
            network: &mut network,
            identity: &mut identity,
        },
    );
    assert!(result.is_err());
}

#[test]
fn shipped_config_matches_defaults() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/config/generator.json");
    let loaded = GeneratorConfig::load(&path).expect("load shipped config");
    assert_eq!(loaded, GeneratorConfig::default());
}

#[test]
fn validate_rejects_bad_weights_and_dates() {
    let mut config = GeneratorConfig::default_test();
    config.countries.weights = vec![0.5, 0.2, 0.1, 0.1];
    assert!(config.validate().is_err());

    let mut config = GeneratorConfig::default_test();
    config.end_date = config.start_date.pred_opt().expect("previous day");
    assert!(config.validate().is_err());

    assert!(GeneratorConfig::default_test().validate().is_ok());
}

#[test]
fn zero_transactions_is_rejected_before_generation() {
    let config = GeneratorConfig {
        num_transactions: 0,
        ..GeneratorConfig::default_test()
    };
    let result = StageContext::in_memory(Settings::default(), config);
    assert!(matches!(result, Err(OpsError::InvalidConfig(_))));
}
