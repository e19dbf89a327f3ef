use sea_orm::sea_query::Expr;
use serde::Serialize;

use crate::{
  entity::{
    CommissionStatus, CommissionType, affiliate, affiliate_referral,
    commission,
  },
  prelude::*,
  utils,
};

/// Derived totals persisted on the affiliate row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffiliateStats {
  pub affiliate_id: i32,
  pub total_clicks: i32,
  pub total_sales: i32,
  pub total_earnings: i64,
  pub paid_earnings: i64,
  pub pending_earnings: i64,
  pub conversion_rate: f64,
}

impl From<&affiliate::Model> for AffiliateStats {
  fn from(model: &affiliate::Model) -> Self {
    Self {
      affiliate_id: model.id,
      total_clicks: model.total_clicks,
      total_sales: model.total_sales,
      total_earnings: model.total_earnings,
      paid_earnings: model.paid_earnings,
      pending_earnings: model.pending_earnings,
      conversion_rate: model.conversion_rate,
    }
  }
}

pub struct Stats<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Stats<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn update_affiliate_stats(
    &self,
    affiliate_id: i32,
  ) -> Result<AffiliateStats> {
    let txn = self.db.begin().await?;
    let stats = Self::recompute(&txn, affiliate_id).await?;
    txn.commit().await?;
    Ok(stats)
  }

  /// Rebuilds every derived field from the referral table and the ledger.
  /// Never adjusts the stored values incrementally.
  pub async fn recompute<C: ConnectionTrait>(
    conn: &C,
    affiliate_id: i32,
  ) -> Result<AffiliateStats> {
    let affiliate = affiliate::Entity::find_by_id(affiliate_id)
      .one(conn)
      .await?
      .ok_or(Error::AffiliateNotFound)?;

    let sales = affiliate_referral::Entity::find()
      .filter(affiliate_referral::Column::AffiliateId.eq(affiliate_id))
      .filter(affiliate_referral::Column::Converted.eq(true))
      .count(conn)
      .await? as i32;

    let total = earned(
      conn,
      affiliate_id,
      &[CommissionStatus::Confirmed, CommissionStatus::Paid],
    )
    .await?;
    let paid = earned(conn, affiliate_id, &[CommissionStatus::Paid]).await?;
    let conversion =
      utils::percent(sales as i64, affiliate.total_clicks as i64);

    let affiliate = affiliate::ActiveModel {
      total_sales: Set(sales),
      total_earnings: Set(total),
      paid_earnings: Set(paid),
      pending_earnings: Set(total - paid),
      conversion_rate: Set(conversion),
      ..affiliate.into()
    }
    .update(conn)
    .await?;

    debug!(
      "Affiliate #{} stats: {} sales, earned {}, pending {}",
      affiliate_id,
      sales,
      utils::format_money(total),
      utils::format_money(total - paid)
    );
    Ok(AffiliateStats::from(&affiliate))
  }

  pub async fn get(&self, affiliate_id: i32) -> Result<AffiliateStats> {
    affiliate::Entity::find_by_id(affiliate_id)
      .one(self.db)
      .await?
      .map(|model| AffiliateStats::from(&model))
      .ok_or(Error::AffiliateNotFound)
  }
}

async fn earned<C: ConnectionTrait>(
  conn: &C,
  affiliate_id: i32,
  statuses: &[CommissionStatus],
) -> Result<i64> {
  let sum: Option<Option<i64>> = commission::Entity::find()
    .select_only()
    .column_as(Expr::col(commission::Column::Amount).sum(), "total")
    .filter(commission::Column::AffiliateId.eq(affiliate_id))
    .filter(commission::Column::CommissionType.eq(CommissionType::Affiliate))
    .filter(commission::Column::Status.is_in(statuses.iter().copied()))
    .into_tuple()
    .one(conn)
    .await?;

  Ok(sum.flatten().unwrap_or(0))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::{AffiliateStatus, CommissionMode},
    sv::test_utils::{seed, test_db},
  };

  #[tokio::test]
  async fn test_recompute_from_ledger() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;

    use CommissionStatus::*;
    for (amount, status) in
      [(5_000, Confirmed), (3_000, Paid), (1_000, Pending), (700, Cancelled)]
    {
      seed::commission(&db, affiliate.id, amount, status, 0).await;
    }

    let stats =
      Stats::new(&db).update_affiliate_stats(affiliate.id).await.unwrap();

    assert_eq!(stats.total_earnings, 8_000);
    assert_eq!(stats.paid_earnings, 3_000);
    assert_eq!(stats.pending_earnings, 5_000);
    assert_eq!(stats.total_sales, 0);
    assert_eq!(stats.conversion_rate, 0.0);
  }

  #[tokio::test]
  async fn test_recompute_is_idempotent() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    seed::commission(&db, affiliate.id, 2_500, CommissionStatus::Confirmed, 0)
      .await;
    let sv = Stats::new(&db);

    let first = sv.update_affiliate_stats(affiliate.id).await.unwrap();
    let second = sv.update_affiliate_stats(affiliate.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(sv.get(affiliate.id).await.unwrap(), second);
  }

  #[tokio::test]
  async fn test_conversion_rate() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let order = seed::order(&db, Some(affiliate.id), &[]).await;

    affiliate::ActiveModel {
      total_clicks: Set(3),
      ..affiliate.clone().into()
    }
    .update(&db)
    .await
    .unwrap();

    affiliate_referral::ActiveModel {
      id: NotSet,
      affiliate_id: Set(affiliate.id),
      customer_id: Set(Some(1)),
      referral_code: Set(affiliate.affiliate_code.clone()),
      ip_address: Set("10.0.0.1".into()),
      user_agent: Set(None),
      landing_url: Set(None),
      source: Set(Default::default()),
      dedup_key: Set("converted".into()),
      converted: Set(true),
      converted_at: Set(Some(utils::now())),
      order_id: Set(Some(order.id)),
      created_at: Set(utils::now()),
    }
    .insert(&db)
    .await
    .unwrap();

    let stats =
      Stats::new(&db).update_affiliate_stats(affiliate.id).await.unwrap();

    assert_eq!(stats.total_sales, 1);
    assert_eq!(stats.conversion_rate, 33.33);
  }
}
