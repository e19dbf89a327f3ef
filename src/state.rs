use crate::{prelude::*, sv};

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    let db = Database::connect(&config.database_url)
      .await
      .with_context(|| format!("connect to {}", config.database_url))?;

    migration::Migrator::up(&db, None)
      .await
      .context("Failed to run migrations")?;

    Ok(Self { db, config })
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      affiliate: sv::Affiliate::new(&self.db, &self.config),
      referral: sv::Referral::new(&self.db, &self.config),
      pricing: sv::Pricing::new(&self.db),
      order: sv::Order::new(&self.db),
      commission: sv::Commission::new(&self.db),
      payout: sv::Payout::new(&self.db),
      stats: sv::Stats::new(&self.db),
      jobs: sv::Jobs::new(&self.db, &self.config),
    }
  }
}

pub struct Services<'a> {
  pub affiliate: sv::Affiliate<'a>,
  pub referral: sv::Referral<'a>,
  pub pricing: sv::Pricing<'a>,
  pub order: sv::Order<'a>,
  pub commission: sv::Commission<'a>,
  pub payout: sv::Payout<'a>,
  pub stats: sv::Stats<'a>,
  pub jobs: sv::Jobs<'a>,
}
