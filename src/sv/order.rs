use serde::Deserialize;

use crate::{
  entity::{affiliate, order, order_item},
  prelude::*,
  sv::{Jobs, Referral},
  utils,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
  pub product_id: i32,
  pub merchant_id: Option<i64>,
  pub quantity: i32,
  pub sell_price: i64,
  pub base_price: i64,
  pub merchant_price: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
  pub company_id: i64,
  pub customer_id: Option<i64>,
  pub affiliate_id: Option<i32>,
  pub referral_id: Option<i32>,
  #[serde(default)]
  pub shipping: i64,
  pub items: Vec<NewOrderItem>,
}

impl NewOrder {
  fn validate(&self) -> Result<()> {
    if self.items.is_empty() {
      return Err(Error::InvalidArgs("Order has no items".into()));
    }
    if self.shipping < 0 {
      return Err(Error::InvalidArgs("Shipping must not be negative".into()));
    }
    if self.referral_id.is_some() && self.affiliate_id.is_none() {
      return Err(Error::InvalidArgs(
        "Referral given for an order without affiliate".into(),
      ));
    }

    for item in &self.items {
      if item.quantity <= 0 {
        return Err(Error::InvalidArgs(format!(
          "Quantity of product #{} must be positive",
          item.product_id
        )));
      }
      // Every share of the line split stays non-negative
      if item.merchant_price < 0
        || item.merchant_price > item.base_price
        || item.base_price > item.sell_price
      {
        return Err(Error::InvalidArgs(format!(
          "Prices of product #{} must satisfy 0 <= merchant <= base <= sell",
          item.product_id
        )));
      }
    }

    Ok(())
  }

  /// `Σ sell_price * quantity`.
  fn subtotal(&self) -> Result<i64> {
    self.items.iter().try_fold(0i64, |sum, item| {
      let line = item.sell_price.checked_mul(item.quantity as i64);
      utils::checked(line.and_then(|line| sum.checked_add(line)))
    })
  }
}

pub struct Order<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Order<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Persists the order with its price snapshots and queues commission
  /// calculation in the same transaction, so a committed order always has
  /// a job that will produce its ledger rows.
  pub async fn place(&self, req: NewOrder) -> Result<order::Model> {
    req.validate()?;

    let subtotal = req.subtotal()?;
    let total = utils::checked(subtotal.checked_add(req.shipping))?;

    let txn = self.db.begin().await?;

    if let Some(affiliate_id) = req.affiliate_id {
      affiliate::Entity::find_by_id(affiliate_id)
        .one(&txn)
        .await?
        .ok_or(Error::AffiliateNotFound)?;
    }

    let order = order::ActiveModel {
      id: NotSet,
      company_id: Set(req.company_id),
      customer_id: Set(req.customer_id),
      affiliate_id: Set(req.affiliate_id),
      referral_id: Set(req.referral_id),
      subtotal: Set(subtotal),
      shipping: Set(req.shipping),
      total: Set(total),
      created_at: Set(utils::now()),
    }
    .insert(&txn)
    .await?;

    let items = req.items.into_iter().map(|item| order_item::ActiveModel {
      id: NotSet,
      order_id: Set(order.id),
      product_id: Set(item.product_id),
      merchant_id: Set(item.merchant_id),
      quantity: Set(item.quantity),
      sell_price: Set(item.sell_price),
      base_price: Set(item.base_price),
      merchant_price: Set(item.merchant_price),
    });
    order_item::Entity::insert_many(items).exec(&txn).await?;

    if let (Some(referral_id), Some(affiliate_id)) =
      (req.referral_id, req.affiliate_id)
    {
      Referral::mark_converted(
        &txn,
        referral_id,
        affiliate_id,
        order.id,
        req.customer_id,
      )
      .await?;
    }

    Jobs::enqueue(&txn, order.id).await?;

    txn.commit().await?;

    info!(
      "Order #{} placed for company {}, total {}",
      order.id,
      order.company_id,
      utils::format_money(order.total)
    );
    Ok(order)
  }

  pub async fn by_id(&self, id: i32) -> Result<order::Model> {
    order::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::OrderNotFound)
  }

  pub async fn items(&self, order_id: i32) -> Result<Vec<order_item::Model>> {
    Ok(
      order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(self.db)
        .await?,
    )
  }
}
