use serde::Deserialize;
use uuid::Uuid;

use crate::{
  entity::{AffiliateStatus, CommissionMode, affiliate},
  prelude::*,
  utils::{self, BPS},
};

pub const CODE_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAffiliate {
  pub user_id: i64,
  pub company_id: i64,
  #[serde(default)]
  pub commission_mode: CommissionMode,
  /// Basis points.
  pub commission_rate: i32,
  #[serde(default)]
  pub min_payout: i64,
}

pub struct Affiliate<'a> {
  db: &'a DatabaseConnection,
  attempts: u32,
  gen_code: fn() -> String,
}

impl<'a> Affiliate<'a> {
  pub fn new(db: &'a DatabaseConnection, config: &Config) -> Self {
    Self { db, attempts: config.code_attempts, gen_code: random_code }
  }

  #[cfg(test)]
  pub fn with_codes(mut self, gen_code: fn() -> String) -> Self {
    self.gen_code = gen_code;
    self
  }

  /// Registers a user as an affiliate of a company. New affiliates wait in
  /// `Pending` until an admin activates them.
  pub async fn register(
    &self,
    req: RegisterAffiliate,
  ) -> Result<affiliate::Model> {
    check_rate(req.commission_rate)?;
    if req.min_payout < 0 {
      return Err(Error::InvalidArgs(
        "Minimum payout must not be negative".into(),
      ));
    }

    let txn = self.db.begin().await?;

    let existing = affiliate::Entity::find()
      .filter(affiliate::Column::UserId.eq(req.user_id))
      .one(&txn)
      .await?;

    if existing.is_some() {
      return Err(Error::AlreadyAffiliated(req.user_id));
    }

    let code = self.unique_code(&txn).await?;

    let affiliate = affiliate::ActiveModel {
      id: NotSet,
      user_id: Set(req.user_id),
      company_id: Set(req.company_id),
      affiliate_code: Set(code),
      commission_mode: Set(req.commission_mode),
      commission_rate: Set(req.commission_rate),
      status: Set(AffiliateStatus::Pending),
      total_clicks: Set(0),
      total_sales: Set(0),
      total_earnings: Set(0),
      paid_earnings: Set(0),
      pending_earnings: Set(0),
      conversion_rate: Set(0.0),
      min_payout: Set(req.min_payout),
      version: Set(0),
      created_at: Set(utils::now()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
      "Affiliate #{} registered for user {} with code {}",
      affiliate.id, affiliate.user_id, affiliate.affiliate_code
    );
    Ok(affiliate)
  }

  async fn unique_code<C: ConnectionTrait>(&self, conn: &C) -> Result<String> {
    for _ in 0..self.attempts {
      let code = (self.gen_code)();

      let taken = affiliate::Entity::find()
        .filter(affiliate::Column::AffiliateCode.eq(code.as_str()))
        .count(conn)
        .await?;

      if taken == 0 {
        return Ok(code);
      }
      debug!("Affiliate code {} is taken, retrying", code);
    }

    Err(Error::CodeGeneration(self.attempts))
  }

  pub async fn by_id(&self, id: i32) -> Result<affiliate::Model> {
    affiliate::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::AffiliateNotFound)
  }

  pub async fn by_code(&self, code: &str) -> Result<affiliate::Model> {
    affiliate::Entity::find()
      .filter(affiliate::Column::AffiliateCode.eq(code))
      .filter(affiliate::Column::Status.eq(AffiliateStatus::Active))
      .one(self.db)
      .await?
      .ok_or(Error::AffiliateNotFound)
  }

  /// Admin action, the only way an affiliate changes status.
  pub async fn set_status(
    &self,
    id: i32,
    status: AffiliateStatus,
  ) -> Result<affiliate::Model> {
    let affiliate = self.by_id(id).await?;
    let previous = affiliate.status;

    let affiliate =
      affiliate::ActiveModel { status: Set(status), ..affiliate.into() }
        .update(self.db)
        .await?;

    info!("Affiliate #{} status {:?} -> {:?}", id, previous, status);
    Ok(affiliate)
  }

  pub async fn set_commission(
    &self,
    id: i32,
    mode: CommissionMode,
    rate: i32,
  ) -> Result<affiliate::Model> {
    check_rate(rate)?;
    let affiliate = self.by_id(id).await?;

    Ok(
      affiliate::ActiveModel {
        commission_mode: Set(mode),
        commission_rate: Set(rate),
        ..affiliate.into()
      }
      .update(self.db)
      .await?,
    )
  }
}

fn check_rate(rate: i32) -> Result<()> {
  if !(0..=BPS as i32).contains(&rate) {
    return Err(Error::InvalidArgs(format!(
      "Commission rate must be within 0..={BPS} basis points"
    )));
  }
  Ok(())
}

pub fn random_code() -> String {
  Uuid::new_v4().simple().to_string()[..CODE_LEN].to_uppercase()
}
