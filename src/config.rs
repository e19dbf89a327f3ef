use std::{env, str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  /// Window inside which a repeat visit is folded into the first referral.
  pub referral_cooldown: Duration,
  pub code_attempts: u32,
  pub commission_poll_interval: Duration,
  pub commission_batch: u64,
  pub commission_max_attempts: i32,
  pub commission_backoff_base_secs: u64,
  pub commission_claim_lease: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: "sqlite:affiliate.db?mode=rwc".into(),
      port: 3000,
      referral_cooldown: Duration::from_secs(3600),
      code_attempts: 10,
      commission_poll_interval: Duration::from_secs(5),
      commission_batch: 50,
      commission_max_attempts: 8,
      commission_backoff_base_secs: 2,
      commission_claim_lease: Duration::from_secs(60),
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let def = Self::default();

    Ok(Self {
      database_url: env::var("DATABASE_URL").unwrap_or(def.database_url),
      port: parsed("PORT")?.unwrap_or(def.port),
      referral_cooldown: duration("REFERRAL_COOLDOWN")?
        .unwrap_or(def.referral_cooldown),
      code_attempts: parsed("AFFILIATE_CODE_ATTEMPTS")?
        .unwrap_or(def.code_attempts),
      commission_poll_interval: duration("COMMISSION_POLL_INTERVAL")?
        .unwrap_or(def.commission_poll_interval),
      commission_batch: parsed("COMMISSION_BATCH")?
        .unwrap_or(def.commission_batch),
      commission_max_attempts: parsed("COMMISSION_MAX_ATTEMPTS")?
        .unwrap_or(def.commission_max_attempts),
      commission_backoff_base_secs: parsed("COMMISSION_BACKOFF_BASE_SECS")?
        .unwrap_or(def.commission_backoff_base_secs),
      commission_claim_lease: duration("COMMISSION_CLAIM_LEASE")?
        .unwrap_or(def.commission_claim_lease),
    })
  }
}

fn parsed<T>(key: &str) -> anyhow::Result<Option<T>>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  env::var(key)
    .ok()
    .map(|raw| raw.trim().parse().with_context(|| format!("invalid {key}")))
    .transpose()
}

fn duration(key: &str) -> anyhow::Result<Option<Duration>> {
  env::var(key)
    .ok()
    .map(|raw| {
      humantime::parse_duration(raw.trim())
        .with_context(|| format!("invalid {key}, expected e.g. `1h` or `30m`"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_match_documented_values() {
    let config = Config::default();

    assert_eq!(config.referral_cooldown, Duration::from_secs(60 * 60));
    assert_eq!(config.code_attempts, 10);
    assert_eq!(config.commission_max_attempts, 8);
  }
}
