use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};

use crate::{
  entity::{
    AffiliateStatus, CommissionStatus, CommissionType, PaymentDetails,
    PayoutStatus, affiliate, affiliate_payout, commission,
  },
  prelude::*,
  sv::Stats,
  utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalSettlement {
  pub transaction_id: String,
  pub external_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutAllocation {
  pub payout: affiliate_payout::Model,
  /// Commission ids linked to the payout, oldest first.
  pub linked: Vec<i32>,
  /// May be less than the requested amount, commissions are never split.
  pub linked_amount: i64,
}

/// Greedy first-fit over `(id, amount)` candidates in FIFO order. A
/// commission that does not fit is skipped and later ones may still fit.
pub fn allocate(candidates: &[(i32, i64)], requested: i64) -> Vec<i32> {
  let mut running = 0;
  let mut linked = Vec::new();

  for &(id, amount) in candidates {
    if running + amount <= requested {
      running += amount;
      linked.push(id);
    }
  }

  linked
}

pub struct Payout<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Payout<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn process_payout(
    &self,
    affiliate_id: i32,
    amount: i64,
    details: PaymentDetails,
  ) -> Result<PayoutAllocation> {
    if amount <= 0 {
      return Err(Error::InvalidArgs("Payout amount must be positive".into()));
    }
    check_details(&details)?;

    let txn = self.db.begin().await?;

    let affiliate = affiliate::Entity::find_by_id(affiliate_id)
      .one(&txn)
      .await?
      .ok_or(Error::AffiliateNotFound)?;

    if affiliate.status != AffiliateStatus::Active {
      return Err(Error::AffiliateInactive);
    }

    if amount < affiliate.min_payout {
      return Err(Error::InvalidArgs(format!(
        "Minimum payout is {}",
        utils::format_money(affiliate.min_payout)
      )));
    }

    // Confirmed money already promised to an unsettled payout
    let reserved = linked_unpaid(&txn, affiliate_id).await?;
    let available = affiliate.pending_earnings - reserved;
    if amount > available {
      return Err(Error::InsufficientFunds { requested: amount, available });
    }

    let candidates: Vec<(i32, i64)> = unlinked(affiliate_id)
      .select_only()
      .column(commission::Column::Id)
      .column(commission::Column::Amount)
      .order_by_asc(commission::Column::CreatedAt)
      .order_by_asc(commission::Column::Id)
      .into_tuple()
      .all(&txn)
      .await?;

    let linked = allocate(&candidates, amount);
    if linked.is_empty() {
      return Err(Error::InvalidArgs(format!(
        "No confirmed commission fits into {}",
        utils::format_money(amount)
      )));
    }

    bump_version(&txn, affiliate_id, affiliate.version).await?;

    let payout = affiliate_payout::ActiveModel {
      id: NotSet,
      affiliate_id: Set(affiliate_id),
      amount: Set(amount),
      payment_method: Set(details.method()),
      payment_details: Set(details),
      status: Set(PayoutStatus::Pending),
      transaction_id: Set(None),
      external_reference: Set(None),
      processed_at: Set(None),
      created_at: Set(utils::now()),
    }
    .insert(&txn)
    .await?;

    for &id in &linked {
      link(&txn, affiliate_id, payout.id, id).await?;
    }

    let linked_amount = candidates
      .iter()
      .filter(|(id, _)| linked.contains(id))
      .map(|&(_, amount)| amount)
      .sum();

    txn.commit().await?;

    info!(
      "Payout #{} for affiliate #{}: requested {}, linked {} in {} commissions",
      payout.id,
      affiliate_id,
      utils::format_money(amount),
      utils::format_money(linked_amount),
      linked.len()
    );
    Ok(PayoutAllocation { payout, linked, linked_amount })
  }

  /// Terminal transition of a payout after the money left through an
  /// external channel. Linked commissions become `Paid`.
  pub async fn record_external_payout(
    &self,
    payout_id: i32,
    settlement: ExternalSettlement,
  ) -> Result<affiliate_payout::Model> {
    let transaction_id = settlement.transaction_id.trim();
    if transaction_id.is_empty() {
      return Err(Error::InvalidArgs("Transaction id is required".into()));
    }

    let txn = self.db.begin().await?;

    let payout = affiliate_payout::Entity::find_by_id(payout_id)
      .one(&txn)
      .await?
      .ok_or(Error::PayoutNotFound)?;

    if payout.status != PayoutStatus::Pending {
      return Err(Error::InvalidState(format!(
        "Payout #{} is already {:?}",
        payout.id, payout.status
      )));
    }

    let now = utils::now();
    let affiliate_id = payout.affiliate_id;

    let payout = affiliate_payout::ActiveModel {
      status: Set(PayoutStatus::PaidExternal),
      transaction_id: Set(Some(transaction_id.to_string())),
      external_reference: Set(settlement.external_reference),
      processed_at: Set(Some(now)),
      ..payout.into()
    }
    .update(&txn)
    .await?;

    let paid = commission::Entity::update_many()
      .set(commission::ActiveModel {
        status: Set(CommissionStatus::Paid),
        paid_at: Set(Some(now)),
        ..Default::default()
      })
      .filter(commission::Column::PayoutId.eq(payout.id))
      .exec(&txn)
      .await?;

    Stats::recompute(&txn, affiliate_id).await?;

    txn.commit().await?;

    info!(
      "Payout #{} settled externally ({}), {} commissions paid",
      payout.id, transaction_id, paid.rows_affected
    );
    Ok(payout)
  }

  pub async fn by_id(&self, payout_id: i32) -> Result<affiliate_payout::Model> {
    affiliate_payout::Entity::find_by_id(payout_id)
      .one(self.db)
      .await?
      .ok_or(Error::PayoutNotFound)
  }

  pub async fn by_affiliate(
    &self,
    affiliate_id: i32,
  ) -> Result<Vec<affiliate_payout::Model>> {
    Ok(
      affiliate_payout::Entity::find()
        .filter(affiliate_payout::Column::AffiliateId.eq(affiliate_id))
        .order_by_desc(affiliate_payout::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }

  pub async fn commissions(
    &self,
    payout_id: i32,
  ) -> Result<Vec<commission::Model>> {
    Ok(
      commission::Entity::find()
        .filter(commission::Column::PayoutId.eq(payout_id))
        .order_by_asc(commission::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }
}

/// Confirmed affiliate commissions not yet promised to any payout.
fn unlinked(affiliate_id: i32) -> sea_orm::Select<commission::Entity> {
  commission::Entity::find()
    .filter(commission::Column::AffiliateId.eq(affiliate_id))
    .filter(commission::Column::CommissionType.eq(CommissionType::Affiliate))
    .filter(commission::Column::Status.eq(CommissionStatus::Confirmed))
    .filter(commission::Column::PayoutId.is_null())
}

/// Serializes allocations per affiliate. Fails when another allocation
/// moved the version since `seen` was read.
async fn bump_version<C: ConnectionTrait>(
  conn: &C,
  affiliate_id: i32,
  seen: i32,
) -> Result<()> {
  let res = affiliate::Entity::update_many()
    .col_expr(
      affiliate::Column::Version,
      Expr::col(affiliate::Column::Version).add(1),
    )
    .filter(affiliate::Column::Id.eq(affiliate_id))
    .filter(affiliate::Column::Version.eq(seen))
    .exec(conn)
    .await?;

  if res.rows_affected == 0 {
    return Err(Error::Contended(affiliate_id));
  }
  Ok(())
}

/// Links one commission to a payout unless it was linked or changed state
/// after the candidates were read.
async fn link<C: ConnectionTrait>(
  conn: &C,
  affiliate_id: i32,
  payout_id: i32,
  commission_id: i32,
) -> Result<()> {
  let res = commission::Entity::update_many()
    .col_expr(commission::Column::PayoutId, Expr::value(payout_id))
    .filter(commission::Column::Id.eq(commission_id))
    .filter(commission::Column::Status.eq(CommissionStatus::Confirmed))
    .filter(commission::Column::PayoutId.is_null())
    .exec(conn)
    .await?;

  if res.rows_affected == 0 {
    return Err(Error::Contended(affiliate_id));
  }
  Ok(())
}

async fn linked_unpaid<C: ConnectionTrait>(
  conn: &C,
  affiliate_id: i32,
) -> Result<i64> {
  let sum: Option<Option<i64>> = commission::Entity::find()
    .select_only()
    .column_as(Expr::col(commission::Column::Amount).sum(), "total")
    .filter(commission::Column::AffiliateId.eq(affiliate_id))
    .filter(commission::Column::Status.eq(CommissionStatus::Confirmed))
    .filter(commission::Column::PayoutId.is_not_null())
    .into_tuple()
    .one(conn)
    .await?;

  Ok(sum.flatten().unwrap_or(0))
}

fn check_details(details: &PaymentDetails) -> Result<()> {
  let blank = |s: &str| s.trim().is_empty();

  let ok = match details {
    PaymentDetails::BankTransfer { account_name, iban } => {
      let iban: String = iban.chars().filter(|c| !c.is_whitespace()).collect();
      !blank(account_name)
        && (15..=34).contains(&iban.len())
        && iban.chars().all(|c| c.is_ascii_alphanumeric())
    }
    PaymentDetails::Paypal { email } => {
      email.split_once('@').is_some_and(|(user, host)| {
        !blank(user) && host.contains('.') && !host.ends_with('.')
      })
    }
    PaymentDetails::Crypto { network, address } => {
      !blank(network) && !blank(address)
    }
  };

  if !ok {
    return Err(Error::InvalidArgs(format!(
      "Invalid {:?} payment details",
      details.method()
    )));
  }
  Ok(())
}
