use crate::{
    config::GeneratorConfig,
    error::{OpsError, OpsResult},
    name_generator::NameGenerator,
    rng::StreamRng,
    types::{
        AccountStatus, Crypto, Device, Network, OperationType, PaymentMethod, Period, TxnId,
        TxnStatus, UserId,
    },
    user_generator::{log_distribution, pick_weighted, User},
};
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

pub const FAILURE_REASONS: [&str; 6] = [
    "Insufficient funds",
    "Daily limit exceeded",
    "Identity verification failed",
    "Blockchain network timeout",
    "Anti-fraud validation error",
    "Payment method declined",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TxnId,
    pub user_id: UserId,
    pub operation_type: OperationType,
    pub crypto: Crypto,
    pub target_crypto: Option<Crypto>,
    pub crypto_amount: f64,
    pub unit_price_usd: f64,
    pub amount_usd: f64,
    pub fee_usd: f64,
    pub total_usd: f64,
    pub started_at: NaiveDateTime,
    pub completed_at: NaiveDateTime,
    pub processing_seconds: i64,
    pub status: TxnStatus,
    pub failure_reason: Option<String>,
    pub requires_manual_validation: bool,
    pub payment_method: PaymentMethod,
    pub network: Network,
    pub blockchain_hash: Option<String>,
    pub blockchain_confirmations: i64,
    pub fraud_score: f64,
    pub fraud_flagged: bool,
    pub ip_address: String,
    pub user_agent: String,
    pub device: Device,
}

impl Transaction {
    pub fn period(&self) -> Period {
        Period::from_hour(self.started_at.hour())
    }
}

/// Per-run stream handles for the transaction generator.
pub struct TxnStreams<'a> {
    pub main: &'a mut StreamRng,
    pub network: &'a mut StreamRng,
    pub identity: &'a mut StreamRng,
}

/// Generate `config.num_transactions` transactions owned by active users.
///
/// Peak hours (18..=23) receive `timing.peak_share` of the traffic on top
/// of their uniform share, run slower, and fail more often.
pub fn generate_transactions(
    users: &[User],
    config: &GeneratorConfig,
    streams: TxnStreams<'_>,
) -> OpsResult<Vec<Transaction>> {
    let active: Vec<&User> = users
        .iter()
        .filter(|u| u.account_status == AccountStatus::Active)
        .collect();
    if active.is_empty() {
        return Err(OpsError::EmptyDataset(
            "no active users to own transactions".into(),
        ));
    }

    let TxnStreams { main: rng, network: net_rng, identity } = streams;
    let window_days = (config.end_date - config.start_date).num_days();
    let timing = &config.timing;
    let mut txns = Vec::with_capacity(config.num_transactions);

    for i in 1..=config.num_transactions as TxnId {
        let user = *rng
            .pick(&active)
            .ok_or_else(|| OpsError::EmptyDataset("no active users to own transactions".into()))?;

        let mut day = config.start_date + Duration::days(rng.int_inclusive(0, window_days));
        if day < user.registered_at {
            let (lo, hi) = config.late_registration_shift_days;
            day = user.registered_at + Duration::days(rng.int_inclusive(lo, hi));
        }

        let hour = if rng.chance(timing.peak_share) {
            rng.int_inclusive(Period::PEAK_START_HOUR as i64, Period::PEAK_END_HOUR as i64)
        } else {
            rng.int_inclusive(0, 23)
        } as u32;
        let minute = rng.int_inclusive(0, 59) as u32;
        let second = rng.int_inclusive(0, 59) as u32;
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or_else(|| anyhow::anyhow!("invalid time {hour}:{minute}:{second}"))?;
        let started_at = day.and_time(time);

        let operation_type = *pick_weighted(&config.operations.values, &config.operations.weights, rng);
        let crypto = *pick_weighted(&config.cryptos.values, &config.cryptos.weights, rng);

        let band = config.amounts.for_level(user.verification_level);
        let amount_usd = round_to(rng.uniform(band.min_usd, band.max_usd), 2);
        let unit_price =
            crypto.reference_price_usd() * rng.uniform(1.0 - config.price_jitter, 1.0 + config.price_jitter);
        let crypto_amount = amount_usd / unit_price;
        let fee_usd = round_to(amount_usd * config.fee_rate, 2);
        let total_usd = round_to(amount_usd + fee_usd, 2);

        let is_peak = Period::from_hour(hour) == Period::Peak;
        let requires_manual_validation = amount_usd > config.manual_validation_threshold_usd;

        let (lo, hi) = if is_peak {
            timing.peak_base_seconds
        } else {
            timing.normal_base_seconds
        };
        let mut base = rng.int_inclusive(lo, hi);
        if requires_manual_validation {
            let (lo, hi) = timing.validation_extra_seconds;
            base += rng.int_inclusive(lo, hi);
        }
        let processing_seconds =
            (rng.normal(base as f64, timing.noise_std_seconds) as i64).max(timing.min_seconds);

        let mut error_rate = timing.base_error_rate;
        if is_peak {
            error_rate += timing.peak_error_bonus;
        }
        if requires_manual_validation {
            error_rate += timing.validation_error_bonus;
        }

        let (status, failure_reason, completed_at) = if rng.chance(error_rate) {
            let reason = rng.pick(&FAILURE_REASONS).copied().unwrap_or(FAILURE_REASONS[0]).to_string();
            let (lo, hi) = timing.failed_completion_seconds;
            let completed = started_at + Duration::seconds(rng.int_inclusive(lo, hi));
            (TxnStatus::Failed, Some(reason), completed)
        } else {
            (
                TxnStatus::Success,
                None,
                started_at + Duration::seconds(processing_seconds),
            )
        };

        let payment_method =
            *pick_weighted(&config.payment_methods.values, &config.payment_methods.weights, rng);

        let network = match crypto {
            Crypto::Btc => Network::Bitcoin,
            Crypto::Eth | Crypto::Usdt | Crypto::Usdc => net_rng
                .pick(&[Network::Ethereum, Network::Polygon, Network::BinanceSmartChain])
                .copied()
                .unwrap_or(Network::Ethereum),
            _ => net_rng.pick(Network::ALL).copied().unwrap_or(Network::Ethereum),
        };

        let (blockchain_hash, blockchain_confirmations) = if status == TxnStatus::Success {
            (
                Some(NameGenerator::hex_digest(net_rng)),
                net_rng.int_inclusive(1, 12),
            )
        } else {
            (None, 0)
        };

        let mut fraud_score = rng.uniform(0.0, 100.0);
        if amount_usd > config.high_value_fraud_threshold_usd {
            let (lo, hi) = config.high_value_fraud_bump;
            fraud_score = (fraud_score + rng.uniform(lo, hi)).min(100.0);
        }
        let fraud_score = round_to(fraud_score, 2);
        let fraud_flagged = fraud_score > config.fraud_flag_threshold;

        let ip_address = NameGenerator::ipv4(identity);
        let user_agent = NameGenerator::user_agent(identity).to_string();
        let device = identity.pick(Device::ALL).copied().unwrap_or(Device::Desktop);

        let target_crypto = if operation_type == OperationType::Swap {
            let others: Vec<Crypto> = config
                .cryptos
                .values
                .iter()
                .copied()
                .filter(|c| *c != crypto)
                .collect();
            rng.pick(&others).copied()
        } else {
            None
        };

        txns.push(Transaction {
            transaction_id: i,
            user_id: user.user_id,
            operation_type,
            crypto,
            target_crypto,
            crypto_amount: round_to(crypto_amount, 8),
            unit_price_usd: round_to(unit_price, 2),
            amount_usd,
            fee_usd,
            total_usd,
            started_at,
            completed_at,
            processing_seconds,
            status,
            failure_reason,
            requires_manual_validation,
            payment_method,
            network,
            blockchain_hash,
            blockchain_confirmations,
            fraud_score,
            fraud_flagged,
            ip_address,
            user_agent,
            device,
        });

        if i % 20_000 == 0 {
            log::debug!("generated {i} transactions");
        }
    }

    log_distribution("operation", txns.iter().map(|t| t.operation_type.as_str()));
    log_distribution("status", txns.iter().map(|t| t.status.as_str()));
    log_distribution("crypto", txns.iter().map(|t| t.crypto.as_str()));
    Ok(txns)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
