use crate::{
    config::GeneratorConfig,
    name_generator::NameGenerator,
    rng::StreamRng,
    types::{AccountStatus, Country, UserId, VerificationLevel},
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub registered_at: NaiveDate,
    pub country: Country,
    pub city: String,
    pub verification_level: VerificationLevel,
    pub last_verified_at: Option<NaiveDate>,
    pub account_status: AccountStatus,
}

/// Generate `config.num_users` users with ids 1..=N.
///
/// Registration dates skew recent: days before `end_date` follow an
/// exponential with mean `registration_mean_days`, capped at
/// `registration_max_days`.
pub fn generate_users(
    config: &GeneratorConfig,
    rng: &mut StreamRng,
    identity_rng: &mut StreamRng,
) -> Vec<User> {
    let mut names = NameGenerator::new();
    let mut users = Vec::with_capacity(config.num_users);

    for i in 1..=config.num_users as UserId {
        let country = *pick_weighted(&config.countries.values, &config.countries.weights, rng);
        let city = rng.pick(country.cities()).copied().unwrap_or_default().to_string();
        let level = *pick_weighted(
            &config.verification_levels.values,
            &config.verification_levels.weights,
            rng,
        );
        let status = *pick_weighted(
            &config.account_statuses.values,
            &config.account_statuses.weights,
            rng,
        );

        let days_back = (rng.exponential(config.registration_mean_days).floor() as i64)
            .min(config.registration_max_days);
        let registered_at = config.end_date - Duration::days(days_back);

        let last_verified_at = if level == VerificationLevel::Basic {
            None
        } else {
            let (lo, hi) = config.verification_delay_days;
            Some(registered_at + Duration::days(rng.int_inclusive(lo, hi)))
        };

        users.push(User {
            user_id: i,
            username: NameGenerator::username(identity_rng, i),
            email: names.unique_email(identity_rng),
            registered_at,
            country,
            city,
            verification_level: level,
            last_verified_at,
            account_status: status,
        });
    }

    log_distribution("country", users.iter().map(|u| u.country.as_str()));
    log_distribution("verification", users.iter().map(|u| u.verification_level.as_str()));
    log_distribution("status", users.iter().map(|u| u.account_status.as_str()));
    users
}

pub(crate) fn pick_weighted<'a, T>(values: &'a [T], weights: &[f64], rng: &mut StreamRng) -> &'a T {
    &values[rng.weighted_index(weights).min(values.len() - 1)]
}

pub(crate) fn log_distribution<'a>(label: &str, values: impl Iterator<Item = &'a str>) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    log::info!("{label} distribution: {counts:?}");
}
