use crate::{
    error::{OpsError, OpsResult},
    types::{
        AccountStatus, Country, Crypto, OperationType, PaymentMethod, VerificationLevel,
    },
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Runtime settings ───────────────────────────────────────────────

/// Paths and seed for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: String,
    pub data_dir: PathBuf,
    pub viz_dir: PathBuf,
    pub generator_config: PathBuf,
    pub seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: "cryptoops.db".into(),
            data_dir: PathBuf::from("data/processed"),
            viz_dir: PathBuf::from("visualizations"),
            generator_config: PathBuf::from("data/config/generator.json"),
            seed: 42,
        }
    }
}

impl Settings {
    /// Load `.env` (if present) and read CRYPTOOPS_* variables over the defaults.
    pub fn from_env() -> OpsResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(OpsError::InvalidConfig(format!("cannot read .env: {e}")));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> OpsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Self::default();
        if let Some(v) = lookup("CRYPTOOPS_DB") {
            s.db_path = v;
        }
        if let Some(v) = lookup("CRYPTOOPS_DATA_DIR") {
            s.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CRYPTOOPS_VIZ_DIR") {
            s.viz_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("CRYPTOOPS_CONFIG") {
            s.generator_config = PathBuf::from(v);
        }
        if let Some(v) = lookup("CRYPTOOPS_SEED") {
            s.seed = v
                .parse()
                .map_err(|_| OpsError::InvalidConfig(format!("CRYPTOOPS_SEED is not a u64: {v}")))?;
        }
        Ok(s)
    }
}

// ── Generator ──────────────────────────────────────────────────────

/// A categorical distribution: `values[i]` is drawn with `weights[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    pub values: Vec<T>,
    pub weights: Vec<f64>,
}

impl<T> Weighted<T> {
    pub fn new(values: Vec<T>, weights: Vec<f64>) -> Self {
        Self { values, weights }
    }

    fn validate(&self, name: &str) -> OpsResult<()> {
        if self.values.is_empty() {
            return Err(OpsError::InvalidConfig(format!("{name}: no values")));
        }
        if self.values.len() != self.weights.len() {
            return Err(OpsError::InvalidConfig(format!(
                "{name}: {} values but {} weights",
                self.values.len(),
                self.weights.len()
            )));
        }
        if self.weights.iter().any(|w| *w < 0.0) {
            return Err(OpsError::InvalidConfig(format!("{name}: negative weight")));
        }
        let total: f64 = self.weights.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(OpsError::InvalidConfig(format!(
                "{name}: weights sum to {total}, expected 1.0"
            )));
        }
        Ok(())
    }
}

/// Closed USD interval for amounts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountBand {
    pub min_usd: f64,
    pub max_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountBands {
    pub basic: AmountBand,
    pub intermediate: AmountBand,
    pub full: AmountBand,
}

impl AmountBands {
    pub fn for_level(&self, level: VerificationLevel) -> AmountBand {
        match level {
            VerificationLevel::Basic => self.basic,
            VerificationLevel::Intermediate => self.intermediate,
            VerificationLevel::Full => self.full,
        }
    }
}

/// Processing-time and failure model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingModel {
    pub peak_share: f64,
    pub peak_base_seconds: (i64, i64),
    pub normal_base_seconds: (i64, i64),
    pub validation_extra_seconds: (i64, i64),
    pub noise_std_seconds: f64,
    pub min_seconds: i64,
    pub failed_completion_seconds: (i64, i64),
    pub base_error_rate: f64,
    pub peak_error_bonus: f64,
    pub validation_error_bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub num_users: usize,
    pub num_transactions: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub registration_mean_days: f64,
    pub registration_max_days: i64,
    pub verification_delay_days: (i64, i64),
    pub late_registration_shift_days: (i64, i64),
    pub countries: Weighted<Country>,
    pub verification_levels: Weighted<VerificationLevel>,
    pub account_statuses: Weighted<AccountStatus>,
    pub operations: Weighted<OperationType>,
    pub cryptos: Weighted<Crypto>,
    pub payment_methods: Weighted<PaymentMethod>,
    pub amounts: AmountBands,
    pub price_jitter: f64,
    pub fee_rate: f64,
    pub manual_validation_threshold_usd: f64,
    pub high_value_fraud_threshold_usd: f64,
    pub high_value_fraud_bump: (f64, f64),
    pub fraud_flag_threshold: f64,
    pub timing: TimingModel,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_users: 10_000,
            num_transactions: 100_000,
            start_date: ymd(2024, 7, 1),
            end_date: ymd(2024, 12, 31),
            registration_mean_days: 180.0,
            registration_max_days: 545,
            verification_delay_days: (1, 30),
            late_registration_shift_days: (0, 30),
            countries: Weighted::new(
                Country::ALL.to_vec(),
                vec![0.6, 0.2, 0.1, 0.1],
            ),
            verification_levels: Weighted::new(
                VerificationLevel::ALL.to_vec(),
                vec![0.5, 0.3, 0.2],
            ),
            account_statuses: Weighted::new(
                AccountStatus::ALL.to_vec(),
                vec![0.95, 0.04, 0.01],
            ),
            operations: Weighted::new(
                OperationType::ALL.to_vec(),
                vec![0.45, 0.35, 0.15, 0.05],
            ),
            cryptos: Weighted::new(
                Crypto::ALL.to_vec(),
                vec![0.30, 0.25, 0.20, 0.15, 0.05, 0.03, 0.02],
            ),
            payment_methods: Weighted::new(
                PaymentMethod::ALL.to_vec(),
                vec![0.50, 0.35, 0.15],
            ),
            amounts: AmountBands {
                basic: AmountBand { min_usd: 10.0, max_usd: 1_000.0 },
                intermediate: AmountBand { min_usd: 100.0, max_usd: 5_000.0 },
                full: AmountBand { min_usd: 500.0, max_usd: 20_000.0 },
            },
            price_jitter: 0.02,
            fee_rate: 0.005,
            manual_validation_threshold_usd: 5_000.0,
            high_value_fraud_threshold_usd: 10_000.0,
            high_value_fraud_bump: (10.0, 30.0),
            fraud_flag_threshold: 75.0,
            timing: TimingModel {
                peak_share: 0.6,
                peak_base_seconds: (60, 150),
                normal_base_seconds: (20, 60),
                validation_extra_seconds: (30, 120),
                noise_std_seconds: 20.0,
                min_seconds: 10,
                failed_completion_seconds: (5, 30),
                base_error_rate: 0.05,
                peak_error_bonus: 0.10,
                validation_error_bonus: 0.05,
            },
        }
    }
}

impl GeneratorConfig {
    /// Read a JSON generator config and validate it.
    pub fn load(path: &std::path::Path) -> OpsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &std::path::Path) -> OpsResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("{} not found, using built-in generator defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Small population for unit and integration tests.
    pub fn default_test() -> Self {
        Self {
            num_users: 300,
            num_transactions: 3_000,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> OpsResult<()> {
        if self.num_users == 0 {
            return Err(OpsError::InvalidConfig("num_users must be > 0".into()));
        }
        if self.num_transactions == 0 {
            return Err(OpsError::InvalidConfig("num_transactions must be > 0".into()));
        }
        if self.end_date < self.start_date {
            return Err(OpsError::InvalidConfig(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            )));
        }
        self.countries.validate("countries")?;
        self.verification_levels.validate("verification_levels")?;
        self.account_statuses.validate("account_statuses")?;
        self.operations.validate("operations")?;
        self.cryptos.validate("cryptos")?;
        self.payment_methods.validate("payment_methods")?;

        let ranges = [
            ("verification_delay_days", self.verification_delay_days),
            ("late_registration_shift_days", self.late_registration_shift_days),
            ("peak_base_seconds", self.timing.peak_base_seconds),
            ("normal_base_seconds", self.timing.normal_base_seconds),
            ("validation_extra_seconds", self.timing.validation_extra_seconds),
            ("failed_completion_seconds", self.timing.failed_completion_seconds),
        ];
        for (name, (lo, hi)) in ranges {
            if hi < lo {
                return Err(OpsError::InvalidConfig(format!("{name}: {lo} > {hi}")));
            }
        }
        for (name, band) in [
            ("basic", self.amounts.basic),
            ("intermediate", self.amounts.intermediate),
            ("full", self.amounts.full),
        ] {
            if band.max_usd < band.min_usd {
                return Err(OpsError::InvalidConfig(format!("amounts.{name}: inverted band")));
            }
        }
        if !(0.0..=1.0).contains(&self.timing.peak_share) {
            return Err(OpsError::InvalidConfig("timing.peak_share outside [0, 1]".into()));
        }
        Ok(())
    }
}

// ── Analyzer ───────────────────────────────────────────────────────

/// Automatic-validation rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRules {
    pub max_auto_amount_usd: f64,
    pub max_fraud_score: f64,
    pub min_verification_level: VerificationLevel,
    pub allowed_payment_methods: Vec<PaymentMethod>,
    pub auto_validation_seconds: i64,
    pub manual_validation_seconds: i64,
}

impl Default for ValidatorRules {
    fn default() -> Self {
        Self {
            max_auto_amount_usd: 10_000.0,
            max_fraud_score: 30.0,
            min_verification_level: VerificationLevel::Intermediate,
            allowed_payment_methods: vec![PaymentMethod::BankTransfer, PaymentMethod::CryptoWallet],
            auto_validation_seconds: 5,
            manual_validation_seconds: 300,
        }
    }
}

/// Hard-coded improvement percentages used by the projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub time_reduction: f64,
    pub error_reduction: f64,
    pub capacity_growth: f64,
    pub volume_growth: f64,
    pub baseline_reduction: f64,
    pub automation_base_reduction: f64,
    pub automation_bonus: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            time_reduction: 0.227,
            error_reduction: 0.467,
            capacity_growth: 0.12,
            volume_growth: 0.10,
            baseline_reduction: 0.22,
            automation_base_reduction: 0.15,
            automation_bonus: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub analysis_start: NaiveDate,
    pub slow_threshold_seconds: i64,
    pub error_rate_critical_pct: f64,
    pub optimization_sample_size: usize,
    pub before_after_sample_size: usize,
    pub validator: ValidatorRules,
    pub projection: ProjectionConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            analysis_start: ymd(2024, 7, 1),
            slow_threshold_seconds: 300,
            error_rate_critical_pct: 10.0,
            optimization_sample_size: 10_000,
            before_after_sample_size: 1_000,
            validator: ValidatorRules::default(),
            projection: ProjectionConfig::default(),
        }
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        GeneratorConfig::default().validate().unwrap();
        GeneratorConfig::default_test().validate().unwrap();
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut cfg = GeneratorConfig::default();
        cfg.countries.weights = vec![0.5, 0.2, 0.1, 0.1];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("countries"), "{err}");
    }

    #[test]
    fn empty_populations_rejected() {
        let no_txns = GeneratorConfig {
            num_transactions: 0,
            ..GeneratorConfig::default_test()
        };
        let err = no_txns.validate().unwrap_err();
        assert!(matches!(err, OpsError::InvalidConfig(ref m) if m.contains("num_transactions")), "{err}");

        let no_users = GeneratorConfig {
            num_users: 0,
            ..GeneratorConfig::default_test()
        };
        assert!(matches!(no_users.validate(), Err(OpsError::InvalidConfig(_))));
    }

    #[test]
    fn inverted_dates_rejected() {
        let cfg = GeneratorConfig {
            end_date: ymd(2024, 6, 1),
            ..GeneratorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn settings_from_lookup_overrides_defaults() {
        let s = Settings::from_lookup(|k| match k {
            "CRYPTOOPS_DB" => Some("/tmp/x.db".into()),
            "CRYPTOOPS_SEED" => Some("7".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(s.db_path, "/tmp/x.db");
        assert_eq!(s.seed, 7);
        assert_eq!(s.viz_dir, PathBuf::from("visualizations"));
    }

    #[test]
    fn bad_seed_is_config_error() {
        let err = Settings::from_lookup(|k| (k == "CRYPTOOPS_SEED").then(|| "abc".into())).unwrap_err();
        assert!(matches!(err, OpsError::InvalidConfig(_)));
    }

    #[test]
    fn json_round_trip_keeps_config() {
        let cfg = GeneratorConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
