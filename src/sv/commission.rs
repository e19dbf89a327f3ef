use std::collections::BTreeMap;

use sea_orm::sea_query::{Expr, OnConflict};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{
    CommissionMode, CommissionStatus, CommissionType, affiliate,
    affiliate_product, commission, order, order_item,
  },
  prelude::*,
  sv::Stats,
  utils,
};

/// Three-way division of an order's revenue.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfitSplit {
  pub affiliate: i64,
  pub platform: i64,
  pub merchants: BTreeMap<i64, i64>,
}

impl ProfitSplit {
  /// Splits each line as `merchant_price`, `base - merchant` and
  /// `sell - base`, times quantity. Lines without a merchant are platform
  /// stock and an unattributed margin also stays with the platform, so the
  /// parts always add up to `Σ sell_price * quantity`.
  pub fn from_items(
    items: &[order_item::Model],
    attributed: bool,
  ) -> Result<Self> {
    let mut split = Self::default();

    for item in items {
      if item.merchant_price < 0
        || item.merchant_price > item.base_price
        || item.base_price > item.sell_price
      {
        return Err(Error::InvalidState(format!(
          "Order item #{} has prices out of order",
          item.id
        )));
      }

      let qty = item.quantity as i64;
      let line = |price: i64| utils::checked(price.checked_mul(qty));
      let merchant = line(item.merchant_price)?;
      let platform = line(item.base_price - item.merchant_price)?;
      let margin = line(item.sell_price - item.base_price)?;

      match item.merchant_id {
        Some(id) => add(split.merchants.entry(id).or_default(), merchant)?,
        None => add(&mut split.platform, merchant)?,
      }
      add(&mut split.platform, platform)?;

      if attributed {
        add(&mut split.affiliate, margin)?;
      } else {
        add(&mut split.platform, margin)?;
      }
    }

    Ok(split)
  }

  /// Replaces the affiliate share with an explicitly computed commission.
  /// The platform absorbs the difference, so the total stays the same.
  pub fn assign_affiliate(&mut self, amount: i64) -> Result<()> {
    let pool = utils::checked(self.affiliate.checked_add(self.platform))?;

    if !(0..=pool).contains(&amount) {
      return Err(Error::InvalidState(format!(
        "Affiliate commission {} does not fit the order margin {}",
        utils::format_money(amount),
        utils::format_money(pool)
      )));
    }

    self.affiliate = amount;
    self.platform = pool - amount;
    Ok(())
  }

  pub fn total(&self) -> i64 {
    self
      .merchants
      .values()
      .fold(self.affiliate.saturating_add(self.platform), |sum, &part| {
        sum.saturating_add(part)
      })
  }
}

fn add(acc: &mut i64, amount: i64) -> Result<()> {
  *acc = utils::checked(acc.checked_add(amount))?;
  Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommissionFilter {
  pub affiliate_id: Option<i32>,
  pub merchant_id: Option<i64>,
  pub commission_type: Option<CommissionType>,
  pub status: Option<CommissionStatus>,
  pub from: Option<DateTime>,
  pub to: Option<DateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bucket {
  pub count: i64,
  pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommissionStats {
  pub count: i64,
  pub total: i64,
  pub by_type: HashMap<CommissionType, Bucket>,
  pub by_status: HashMap<CommissionStatus, Bucket>,
}

pub struct Commission<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Commission<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn calculate_commissions(
    &self,
    order_id: i32,
  ) -> Result<Vec<commission::Model>> {
    let txn = self.db.begin().await?;
    let rows = Self::calculate_in(&txn, order_id).await?;
    txn.commit().await?;
    Ok(rows)
  }

  /// Writes the triple-split ledger rows for an order. An order's ledger is
  /// always written whole in one transaction, so rows that already exist
  /// are returned as they are.
  pub async fn calculate_in<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
  ) -> Result<Vec<commission::Model>> {
    let order = order::Entity::find_by_id(order_id)
      .one(conn)
      .await?
      .ok_or(Error::OrderNotFound)?;

    let existing = rows_of(conn, order_id).await?;
    if !existing.is_empty() {
      debug!("Order #{} already has {} commissions", order_id, existing.len());
      return Ok(existing);
    }

    let items = order_item::Entity::find()
      .filter(order_item::Column::OrderId.eq(order_id))
      .all(conn)
      .await?;

    let split = ProfitSplit::from_items(&items, order.affiliate_id.is_some())?;
    let rows = persist(conn, &order, &split).await?;

    info!(
      "Order #{}: {} commissions over {}",
      order.id,
      rows.len(),
      utils::format_money(split.total())
    );
    Ok(rows)
  }

  /// Affiliate commission computed under an explicit mode instead of the
  /// line margin. Writes the order's whole ledger with the platform taking
  /// the rest, or returns the affiliate row of a ledger written earlier.
  /// `None` when the affiliate earns nothing.
  pub async fn calculate_affiliate_commission(
    &self,
    order_id: i32,
    affiliate_id: i32,
    mode: CommissionMode,
  ) -> Result<Option<commission::Model>> {
    let txn = self.db.begin().await?;

    let order = order::Entity::find_by_id(order_id)
      .one(&txn)
      .await?
      .ok_or(Error::OrderNotFound)?;

    let affiliate = affiliate::Entity::find_by_id(affiliate_id)
      .one(&txn)
      .await?
      .ok_or(Error::AffiliateNotFound)?;

    if order.affiliate_id != Some(affiliate.id) {
      return Err(Error::NotAttributed);
    }

    let existing = rows_of(&txn, order_id).await?;
    if !existing.is_empty() {
      txn.commit().await?;
      return Ok(affiliate_row(existing));
    }

    let items = order_item::Entity::find()
      .filter(order_item::Column::OrderId.eq(order_id))
      .all(&txn)
      .await?;

    let amount = match mode {
      CommissionMode::Percentage => {
        utils::apply_bps(order.subtotal, affiliate.commission_rate)
      }
      CommissionMode::Markup => {
        let markups: HashMap<i32, i64> = affiliate_product::Entity::find()
          .filter(affiliate_product::Column::AffiliateId.eq(affiliate.id))
          .filter(affiliate_product::Column::IsActive.eq(true))
          .filter(
            affiliate_product::Column::ProductId
              .is_in(items.iter().map(|item| item.product_id)),
          )
          .all(&txn)
          .await?
          .into_iter()
          .map(|mapping| (mapping.product_id, mapping.markup))
          .collect();

        items.iter().try_fold(0i64, |sum, item| {
          let markup = markups.get(&item.product_id).copied().unwrap_or(0);
          let line = markup.checked_mul(item.quantity as i64);
          utils::checked(line.and_then(|line| sum.checked_add(line)))
        })?
      }
    };

    let mut split = ProfitSplit::from_items(&items, true)?;
    split.assign_affiliate(amount.max(0))?;

    let row = affiliate_row(persist(&txn, &order, &split).await?);
    txn.commit().await?;

    match &row {
      Some(row) => info!(
        "Order #{}: {:?} commission {} for affiliate #{}",
        order_id,
        mode,
        utils::format_money(row.amount),
        affiliate_id
      ),
      None => {
        debug!("Order #{} earns affiliate #{} nothing", order_id, affiliate_id)
      }
    }
    Ok(row)
  }

  /// Order fulfilled, pending rows become payable.
  pub async fn confirm_for_order(&self, order_id: i32) -> Result<u64> {
    self
      .transition(
        order_id,
        &[CommissionStatus::Pending],
        CommissionStatus::Confirmed,
      )
      .await
  }

  /// Refund path. Rows already linked to a payout are left alone.
  pub async fn cancel_for_order(&self, order_id: i32) -> Result<u64> {
    self
      .transition(
        order_id,
        &[CommissionStatus::Pending, CommissionStatus::Confirmed],
        CommissionStatus::Cancelled,
      )
      .await
  }

  async fn transition(
    &self,
    order_id: i32,
    from: &[CommissionStatus],
    to: CommissionStatus,
  ) -> Result<u64> {
    let txn = self.db.begin().await?;

    let order = order::Entity::find_by_id(order_id)
      .one(&txn)
      .await?
      .ok_or(Error::OrderNotFound)?;

    let res = commission::Entity::update_many()
      .set(commission::ActiveModel { status: Set(to), ..Default::default() })
      .filter(commission::Column::OrderId.eq(order_id))
      .filter(commission::Column::Status.is_in(from.iter().copied()))
      .filter(commission::Column::PayoutId.is_null())
      .exec(&txn)
      .await?;

    if let Some(affiliate_id) = order.affiliate_id {
      Stats::recompute(&txn, affiliate_id).await?;
    }

    txn.commit().await?;

    info!(
      "Order #{}: {} commissions moved to {:?}",
      order_id, res.rows_affected, to
    );
    Ok(res.rows_affected)
  }

  pub async fn by_order(
    &self,
    order_id: i32,
  ) -> Result<Vec<commission::Model>> {
    rows_of(self.db, order_id).await
  }

  /// Count and sum of a company's ledger, grouped by type and by status.
  pub async fn stats(
    &self,
    company_id: i64,
    filter: CommissionFilter,
  ) -> Result<CommissionStats> {
    let mut cond =
      Condition::all().add(commission::Column::CompanyId.eq(company_id));

    if let Some(id) = filter.affiliate_id {
      cond = cond.add(commission::Column::AffiliateId.eq(id));
    }
    if let Some(id) = filter.merchant_id {
      cond = cond.add(commission::Column::MerchantId.eq(id));
    }
    if let Some(kind) = filter.commission_type {
      cond = cond.add(commission::Column::CommissionType.eq(kind));
    }
    if let Some(status) = filter.status {
      cond = cond.add(commission::Column::Status.eq(status));
    }
    if let Some(from) = filter.from {
      cond = cond.add(commission::Column::CreatedAt.gte(from));
    }
    if let Some(to) = filter.to {
      cond = cond.add(commission::Column::CreatedAt.lt(to));
    }

    type Row = (CommissionType, CommissionStatus, i64, Option<i64>);
    let rows: Vec<Row> = commission::Entity::find()
      .select_only()
      .column(commission::Column::CommissionType)
      .column(commission::Column::Status)
      .column_as(Expr::col(commission::Column::Id).count(), "count")
      .column_as(Expr::col(commission::Column::Amount).sum(), "total")
      .filter(cond)
      .group_by(commission::Column::CommissionType)
      .group_by(commission::Column::Status)
      .into_tuple()
      .all(self.db)
      .await?;

    let mut stats = CommissionStats::default();
    for (kind, status, count, total) in rows {
      let total = total.unwrap_or(0);

      stats.count += count;
      stats.total += total;

      let bucket = stats.by_type.entry(kind).or_default();
      bucket.count += count;
      bucket.total += total;

      let bucket = stats.by_status.entry(status).or_default();
      bucket.count += count;
      bucket.total += total;
    }

    Ok(stats)
  }
}

async fn rows_of<C: ConnectionTrait>(
  conn: &C,
  order_id: i32,
) -> Result<Vec<commission::Model>> {
  Ok(
    commission::Entity::find()
      .filter(commission::Column::OrderId.eq(order_id))
      .order_by_asc(commission::Column::Id)
      .all(conn)
      .await?,
  )
}

fn affiliate_row(rows: Vec<commission::Model>) -> Option<commission::Model> {
  rows
    .into_iter()
    .find(|row| row.commission_type == CommissionType::Affiliate)
}

/// Inserts the positive parts of a split. Each part owns one
/// `(order_id, split_key)` slot and a slot that is already taken is kept.
async fn persist<C: ConnectionTrait>(
  conn: &C,
  order: &order::Model,
  split: &ProfitSplit,
) -> Result<Vec<commission::Model>> {
  let mut parts = Vec::with_capacity(split.merchants.len() + 2);
  if let Some(affiliate_id) = order.affiliate_id {
    let amount = split.affiliate;
    parts.push((CommissionType::Affiliate, Some(affiliate_id), None, amount));
  }
  for (&merchant_id, &amount) in &split.merchants {
    parts.push((CommissionType::Merchant, None, Some(merchant_id), amount));
  }
  parts.push((CommissionType::Platform, None, None, split.platform));

  let now = utils::now();

  for (kind, affiliate_id, merchant_id, amount) in parts {
    if amount <= 0 {
      continue;
    }

    commission::Entity::insert(commission::ActiveModel {
      id: NotSet,
      order_id: Set(order.id),
      company_id: Set(order.company_id),
      affiliate_id: Set(affiliate_id),
      merchant_id: Set(merchant_id),
      commission_type: Set(kind),
      split_key: Set(kind.split_key(merchant_id)),
      amount: Set(amount),
      order_total: Set(order.total),
      status: Set(CommissionStatus::Pending),
      payout_id: Set(None),
      paid_at: Set(None),
      created_at: Set(now),
    })
    .on_conflict(
      OnConflict::columns([
        commission::Column::OrderId,
        commission::Column::SplitKey,
      ])
      .do_nothing()
      .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;
  }

  rows_of(conn, order.id).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::AffiliateStatus,
    sv::{
      Pricing,
      test_utils::{seed, test_db},
    },
  };

  fn amount_of(rows: &[commission::Model], kind: CommissionType) -> i64 {
    rows
      .iter()
      .filter(|row| row.commission_type == kind)
      .map(|row| row.amount)
      .sum()
  }

  #[test]
  fn test_split_partitions_revenue() {
    let item = |merchant_id, quantity, sell, base, merchant| order_item::Model {
      id: 0,
      order_id: 0,
      product_id: 1,
      merchant_id,
      quantity,
      sell_price: sell,
      base_price: base,
      merchant_price: merchant,
    };
    let items = [
      item(Some(7), 2, 15_000, 10_000, 6_000),
      item(Some(8), 1, 4_999, 4_000, 3_333),
      item(None, 3, 1_000, 900, 500),
    ];
    let revenue: i64 =
      items.iter().map(|i| i.sell_price * i.quantity as i64).sum();

    let attributed = ProfitSplit::from_items(&items, true).unwrap();
    let unattributed = ProfitSplit::from_items(&items, false).unwrap();

    assert_eq!(attributed.total(), revenue);
    assert_eq!(unattributed.total(), revenue);
    assert_eq!(unattributed.affiliate, 0);

    let mut assigned = attributed.clone();
    assigned.assign_affiliate(1_234).unwrap();
    assert_eq!(assigned.affiliate, 1_234);
    assert_eq!(assigned.total(), revenue);
    assert_eq!(assigned.merchants, attributed.merchants);
  }

  #[test]
  fn test_split_rejects_negative_shares() {
    let item = |sell, base, merchant, quantity| order_item::Model {
      id: 3,
      order_id: 0,
      product_id: 1,
      merchant_id: Some(7),
      quantity,
      sell_price: sell,
      base_price: base,
      merchant_price: merchant,
    };

    let err = ProfitSplit::from_items(&[item(900, 1_000, 600, 1)], true)
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let err = ProfitSplit::from_items(&[item(i64::MAX, 10, 5, 2)], true)
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut split =
      ProfitSplit::from_items(&[item(1_000, 800, 500, 1)], true).unwrap();
    let err = split.assign_affiliate(600).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!((split.affiliate, split.platform), (200, 300));
  }

  #[tokio::test]
  async fn test_triple_split() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let order = seed::order(
      &db,
      Some(affiliate.id),
      &[(1, Some(7), 2, 15_000, 10_000, 6_000)],
    )
    .await;

    let rows =
      Commission::new(&db).calculate_commissions(order.id).await.unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(amount_of(&rows, CommissionType::Affiliate), 10_000);
    assert_eq!(amount_of(&rows, CommissionType::Platform), 8_000);
    assert_eq!(amount_of(&rows, CommissionType::Merchant), 12_000);
    assert_eq!(rows.iter().map(|row| row.amount).sum::<i64>(), 30_000);
    assert!(rows.iter().all(|row| row.status == CommissionStatus::Pending));
  }

  #[tokio::test]
  async fn test_merchants_get_one_row_each() {
    let db = test_db::setup().await;
    let order = seed::order(
      &db,
      None,
      &[
        (1, Some(7), 1, 1_000, 800, 500),
        (2, Some(7), 2, 1_000, 800, 500),
        (3, Some(9), 1, 1_000, 800, 400),
      ],
    )
    .await;

    let rows =
      Commission::new(&db).calculate_commissions(order.id).await.unwrap();
    let merchants: Vec<_> = rows
      .iter()
      .filter(|row| row.commission_type == CommissionType::Merchant)
      .map(|row| (row.merchant_id, row.amount))
      .collect();

    assert_eq!(merchants, vec![(Some(7), 1_500), (Some(9), 400)]);
    assert_eq!(amount_of(&rows, CommissionType::Affiliate), 0);
    assert_eq!(rows.iter().map(|row| row.amount).sum::<i64>(), 4_000);
  }

  #[tokio::test]
  async fn test_no_zero_or_negative_rows() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    // sold at cost, platform keeps nothing over the merchant
    let order = seed::order(
      &db,
      Some(affiliate.id),
      &[(1, Some(7), 1, 1_000, 1_000, 1_000)],
    )
    .await;

    let rows =
      Commission::new(&db).calculate_commissions(order.id).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].commission_type, CommissionType::Merchant);
    assert!(rows.iter().all(|row| row.amount > 0));
  }

  #[tokio::test]
  async fn test_calculate_is_idempotent() {
    let db = test_db::setup().await;
    let order =
      seed::order(&db, None, &[(1, Some(7), 1, 1_000, 800, 500)]).await;
    let sv = Commission::new(&db);

    let first = sv.calculate_commissions(order.id).await.unwrap();
    let second = sv.calculate_commissions(order.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(sv.by_order(order.id).await.unwrap().len(), first.len());
  }

  #[tokio::test]
  async fn test_unknown_order() {
    let db = test_db::setup().await;

    let err =
      Commission::new(&db).calculate_commissions(404).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn test_percentage_commission() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let order = seed::order(
      &db,
      Some(affiliate.id),
      &[(1, None, 1, 1_999, 1_500, 1_000)],
    )
    .await;
    let sv = Commission::new(&db);

    let row = sv
      .calculate_affiliate_commission(
        order.id,
        affiliate.id,
        CommissionMode::Percentage,
      )
      .await
      .unwrap()
      .unwrap();
    assert_eq!(row.amount, 200);

    let again = sv
      .calculate_affiliate_commission(
        order.id,
        affiliate.id,
        CommissionMode::Percentage,
      )
      .await
      .unwrap()
      .unwrap();
    assert_eq!(again.id, row.id);
  }

  #[tokio::test]
  async fn test_markup_commission_uses_mappings() {
    let db = test_db::setup().await;
    let affiliate =
      seed::affiliate(&db, 1, CommissionMode::Markup, AffiliateStatus::Active)
        .await;
    let mapped = seed::product(&db, 1_000, Some(800), true).await;
    let unmapped = seed::product(&db, 2_000, Some(1_500), true).await;
    Pricing::new(&db)
      .create_affiliate_product(affiliate.id, mapped.id, 250)
      .await
      .unwrap();

    let order = seed::order(
      &db,
      Some(affiliate.id),
      &[
        (mapped.id, None, 3, 1_050, 800, 600),
        (unmapped.id, None, 1, 2_000, 1_500, 1_000),
      ],
    )
    .await;

    let row = Commission::new(&db)
      .calculate_affiliate_commission(
        order.id,
        affiliate.id,
        CommissionMode::Markup,
      )
      .await
      .unwrap()
      .unwrap();

    assert_eq!(row.amount, 750);
  }

  #[tokio::test]
  async fn test_affiliate_commission_writes_whole_ledger() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let order = seed::order(
      &db,
      Some(affiliate.id),
      &[(1, Some(7), 2, 15_000, 10_000, 6_000)],
    )
    .await;
    let sv = Commission::new(&db);

    let row = sv
      .calculate_affiliate_commission(
        order.id,
        affiliate.id,
        CommissionMode::Percentage,
      )
      .await
      .unwrap()
      .unwrap();
    assert_eq!(row.amount, 3_000);

    let rows = sv.calculate_commissions(order.id).await.unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(amount_of(&rows, CommissionType::Affiliate), 3_000);
    assert_eq!(amount_of(&rows, CommissionType::Merchant), 12_000);
    assert_eq!(amount_of(&rows, CommissionType::Platform), 15_000);
    assert_eq!(rows.iter().map(|row| row.amount).sum::<i64>(), 30_000);
    assert!(rows.iter().any(|r| r.id == row.id && r.amount == 3_000));
  }

  #[tokio::test]
  async fn test_affiliate_commission_reads_existing_ledger() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let order = seed::order(
      &db,
      Some(affiliate.id),
      &[(1, Some(7), 2, 15_000, 10_000, 6_000)],
    )
    .await;
    let sv = Commission::new(&db);

    sv.calculate_commissions(order.id).await.unwrap();
    let row = sv
      .calculate_affiliate_commission(
        order.id,
        affiliate.id,
        CommissionMode::Percentage,
      )
      .await
      .unwrap()
      .unwrap();

    assert_eq!(row.amount, 10_000);
    assert_eq!(sv.by_order(order.id).await.unwrap().len(), 3);
  }

  #[tokio::test]
  async fn test_affiliate_commission_over_margin() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let mut active: affiliate::ActiveModel = affiliate.clone().into();
    active.commission_rate = Set(utils::BPS as i32);
    active.update(&db).await.unwrap();
    // full subtotal of 30.00 against a margin of 18.00
    let order = seed::order(
      &db,
      Some(affiliate.id),
      &[(1, Some(7), 2, 15_000, 10_000, 6_000)],
    )
    .await;
    let sv = Commission::new(&db);

    let err = sv
      .calculate_affiliate_commission(
        order.id,
        affiliate.id,
        CommissionMode::Percentage,
      )
      .await
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(sv.by_order(order.id).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_order_holds_one_row_per_slot() {
    let db = test_db::setup().await;
    let order =
      seed::order(&db, None, &[(1, Some(7), 1, 1_000, 800, 500)]).await;
    let rows =
      Commission::new(&db).calculate_commissions(order.id).await.unwrap();

    for row in rows {
      let mut twin = commission::ActiveModel::from(row).reset_all();
      twin.id = NotSet;
      assert!(twin.insert(&db).await.is_err());
    }

    let order = seed::order(&db, None, &[]).await;
    let platform = |amount| commission::ActiveModel {
      id: NotSet,
      order_id: Set(order.id),
      company_id: Set(1),
      affiliate_id: Set(None),
      merchant_id: Set(None),
      commission_type: Set(CommissionType::Platform),
      split_key: Set(CommissionType::Platform.split_key(None)),
      amount: Set(amount),
      order_total: Set(amount),
      status: Set(CommissionStatus::Pending),
      payout_id: Set(None),
      paid_at: Set(None),
      created_at: Set(utils::now()),
    };

    platform(100).insert(&db).await.unwrap();
    assert!(platform(200).insert(&db).await.is_err());
  }

  #[tokio::test]
  async fn test_affiliate_commission_requires_attribution() {
    let db = test_db::setup().await;
    let owner = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let other = seed::affiliate(
      &db,
      2,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let order =
      seed::order(&db, Some(owner.id), &[(1, None, 1, 1_000, 800, 500)]).await;

    let err = Commission::new(&db)
      .calculate_affiliate_commission(
        order.id,
        other.id,
        CommissionMode::Percentage,
      )
      .await
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
  }

  #[tokio::test]
  async fn test_confirm_updates_affiliate_stats() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let order = seed::order(
      &db,
      Some(affiliate.id),
      &[(1, Some(7), 2, 15_000, 10_000, 6_000)],
    )
    .await;
    let sv = Commission::new(&db);

    sv.calculate_commissions(order.id).await.unwrap();
    assert_eq!(sv.confirm_for_order(order.id).await.unwrap(), 3);

    let affiliate = affiliate::Entity::find_by_id(affiliate.id)
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(affiliate.total_earnings, 10_000);
    assert_eq!(affiliate.pending_earnings, 10_000);

    assert_eq!(sv.cancel_for_order(order.id).await.unwrap(), 3);
    let affiliate = affiliate::Entity::find_by_id(affiliate.id)
      .one(&db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(affiliate.total_earnings, 0);
  }

  #[tokio::test]
  async fn test_company_stats() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let first = seed::order(
      &db,
      Some(affiliate.id),
      &[(1, Some(7), 2, 15_000, 10_000, 6_000)],
    )
    .await;
    let second =
      seed::order(&db, None, &[(1, Some(7), 1, 1_000, 800, 500)]).await;
    let sv = Commission::new(&db);

    sv.calculate_commissions(first.id).await.unwrap();
    sv.calculate_commissions(second.id).await.unwrap();
    sv.confirm_for_order(first.id).await.unwrap();

    let all = sv.stats(1, CommissionFilter::default()).await.unwrap();
    assert_eq!(all.count, 5);
    assert_eq!(all.total, 31_000);
    assert_eq!(all.by_type[&CommissionType::Merchant].total, 12_500);
    assert_eq!(all.by_status[&CommissionStatus::Confirmed].count, 3);
    assert_eq!(all.by_status[&CommissionStatus::Pending].count, 2);

    let mine = sv
      .stats(
        1,
        CommissionFilter {
          affiliate_id: Some(affiliate.id),
          ..Default::default()
        },
      )
      .await
      .unwrap();
    assert_eq!(mine.count, 1);
    assert_eq!(mine.total, 10_000);

    let other = sv.stats(2, CommissionFilter::default()).await.unwrap();
    assert_eq!(other, CommissionStats::default());
  }
}
