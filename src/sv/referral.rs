use sea_orm::sea_query::{Expr, OnConflict};
use serde::Deserialize;

use crate::{
  entity::{AffiliateStatus, ReferralSource, affiliate, affiliate_referral},
  prelude::*,
  utils,
};

/// What the inbound request tells us about the visitor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralMeta {
  pub ip_address: String,
  pub user_agent: Option<String>,
  pub landing_url: Option<String>,
  #[serde(default)]
  pub source: ReferralSource,
}

pub struct Referral<'a> {
  db: &'a DatabaseConnection,
  cooldown: Duration,
}

impl<'a> Referral<'a> {
  pub fn new(db: &'a DatabaseConnection, config: &Config) -> Self {
    Self { db, cooldown: config.referral_cooldown }
  }

  /// Records a click for an active affiliate code. Safe to call for every
  /// request: a visit by the same customer or IP inside the cooldown
  /// returns the earlier referral and leaves the click counter alone.
  pub async fn track(
    &self,
    code: &str,
    customer_id: Option<i64>,
    meta: ReferralMeta,
  ) -> Result<affiliate_referral::Model> {
    let ip = meta.ip_address.trim();
    if ip.is_empty() {
      return Err(Error::InvalidArgs("Visitor IP address is required".into()));
    }

    let txn = self.db.begin().await?;

    let affiliate = affiliate::Entity::find()
      .filter(affiliate::Column::AffiliateCode.eq(code))
      .filter(affiliate::Column::Status.eq(AffiliateStatus::Active))
      .one(&txn)
      .await?
      .ok_or(Error::AffiliateNotFound)?;

    let now = utils::now();
    let window =
      TimeDelta::from_std(self.cooldown).unwrap_or(TimeDelta::hours(1));

    let mut visitor =
      Condition::any().add(affiliate_referral::Column::IpAddress.eq(ip));
    if let Some(customer_id) = customer_id {
      visitor =
        visitor.add(affiliate_referral::Column::CustomerId.eq(customer_id));
    }

    let recent = affiliate_referral::Entity::find()
      .filter(affiliate_referral::Column::AffiliateId.eq(affiliate.id))
      .filter(visitor)
      .filter(affiliate_referral::Column::CreatedAt.gte(now - window))
      .order_by_desc(affiliate_referral::Column::CreatedAt)
      .one(&txn)
      .await?;

    if let Some(referral) = recent {
      txn.commit().await?;
      debug!(
        "Referral #{} reused for affiliate #{} inside cooldown",
        referral.id, affiliate.id
      );
      return Ok(referral);
    }

    let key = dedup_key(affiliate.id, customer_id, ip, now, self.cooldown);

    // A concurrent request for the same visitor lands on the same key
    let inserted = affiliate_referral::Entity::insert(
      affiliate_referral::ActiveModel {
        id: NotSet,
        affiliate_id: Set(affiliate.id),
        customer_id: Set(customer_id),
        referral_code: Set(affiliate.affiliate_code.clone()),
        ip_address: Set(ip.to_string()),
        user_agent: Set(meta.user_agent),
        landing_url: Set(meta.landing_url),
        source: Set(meta.source),
        dedup_key: Set(key.clone()),
        converted: Set(false),
        converted_at: Set(None),
        order_id: Set(None),
        created_at: Set(now),
      },
    )
    .on_conflict(
      OnConflict::column(affiliate_referral::Column::DedupKey)
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(&txn)
    .await?;

    let referral = affiliate_referral::Entity::find()
      .filter(affiliate_referral::Column::DedupKey.eq(key.as_str()))
      .one(&txn)
      .await?
      .ok_or_else(|| {
        Error::Internal(format!("Referral {key} missing after insert"))
      })?;

    if inserted > 0 {
      affiliate::Entity::update_many()
        .col_expr(
          affiliate::Column::TotalClicks,
          Expr::col(affiliate::Column::TotalClicks).add(1),
        )
        .filter(affiliate::Column::Id.eq(affiliate.id))
        .exec(&txn)
        .await?;

      info!(
        "Referral #{} recorded for affiliate #{}",
        referral.id, affiliate.id
      );
    }

    txn.commit().await?;
    Ok(referral)
  }

  /// Attributes a placed order to the referral that brought the customer.
  /// Runs inside the order's transaction.
  pub async fn mark_converted<C: ConnectionTrait>(
    conn: &C,
    referral_id: i32,
    affiliate_id: i32,
    order_id: i32,
    customer_id: Option<i64>,
  ) -> Result<affiliate_referral::Model> {
    let referral = affiliate_referral::Entity::find_by_id(referral_id)
      .one(conn)
      .await?
      .ok_or(Error::ReferralNotFound)?;

    if referral.affiliate_id != affiliate_id {
      return Err(Error::NotAttributed);
    }

    if referral.converted {
      return Err(Error::InvalidState(format!(
        "Referral #{} already converted into order #{}",
        referral.id,
        referral.order_id.unwrap_or_default()
      )));
    }

    let customer_id = referral.customer_id.or(customer_id);

    Ok(
      affiliate_referral::ActiveModel {
        converted: Set(true),
        converted_at: Set(Some(utils::now())),
        order_id: Set(Some(order_id)),
        customer_id: Set(customer_id),
        ..referral.into()
      }
      .update(conn)
      .await?,
    )
  }

  pub async fn by_affiliate(
    &self,
    affiliate_id: i32,
    limit: u64,
  ) -> Result<Vec<affiliate_referral::Model>> {
    Ok(
      affiliate_referral::Entity::find()
        .filter(affiliate_referral::Column::AffiliateId.eq(affiliate_id))
        .order_by_desc(affiliate_referral::Column::CreatedAt)
        .limit(limit)
        .all(self.db)
        .await?,
    )
  }
}

/// `affiliate:visitor:bucket` where the bucket is the cooldown-sized slice
/// of unix time the visit falls into.
fn dedup_key(
  affiliate_id: i32,
  customer_id: Option<i64>,
  ip: &str,
  at: DateTime,
  cooldown: Duration,
) -> String {
  let visitor = match customer_id {
    Some(id) => format!("c{id}"),
    None => format!("ip{ip}"),
  };
  let bucket = at.and_utc().timestamp() / cooldown.as_secs().max(1) as i64;
  format!("{affiliate_id}:{visitor}:{bucket}")
}
