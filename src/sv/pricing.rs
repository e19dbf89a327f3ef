use serde::Serialize;

use crate::{
  entity::{CommissionMode, affiliate, affiliate_product, product},
  prelude::*,
  utils,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
  pub product_id: i32,
  pub price: i64,
  /// Markup affiliate without a mapping for this product. The sale must
  /// wait until the affiliate configures one.
  pub needs_setup: bool,
}

pub struct Pricing<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Pricing<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn price(
    &self,
    affiliate_id: i32,
    product_id: i32,
  ) -> Result<PriceQuote> {
    let affiliate = affiliate::Entity::find_by_id(affiliate_id)
      .one(self.db)
      .await?
      .ok_or(Error::AffiliateNotFound)?;

    let product = product::Entity::find_by_id(product_id)
      .one(self.db)
      .await?
      .ok_or(Error::ProductNotFound)?;

    let canonical =
      PriceQuote { product_id, price: product.price, needs_setup: false };

    if affiliate.commission_mode == CommissionMode::Percentage {
      return Ok(canonical);
    }

    let key = (affiliate_id, product_id);
    let mapping = affiliate_product::Entity::find_by_id(key)
      .filter(affiliate_product::Column::IsActive.eq(true))
      .one(self.db)
      .await?;

    Ok(match mapping {
      Some(mapping) => PriceQuote { price: mapping.final_price, ..canonical },
      None => PriceQuote { needs_setup: true, ..canonical },
    })
  }

  /// Creates or updates the affiliate's markup for a product. The cost basis
  /// is pinned on first creation and kept on later updates, so a catalog
  /// price change never moves an existing mapping.
  pub async fn create_affiliate_product(
    &self,
    affiliate_id: i32,
    product_id: i32,
    markup: i64,
  ) -> Result<affiliate_product::Model> {
    if markup < 0 {
      return Err(Error::InvalidArgs("Markup must not be negative".into()));
    }

    let txn = self.db.begin().await?;

    affiliate::Entity::find_by_id(affiliate_id)
      .one(&txn)
      .await?
      .ok_or(Error::AffiliateNotFound)?;

    let product = product::Entity::find_by_id(product_id)
      .one(&txn)
      .await?
      .ok_or(Error::ProductNotFound)?;

    if !product.allow_affiliate_markup {
      return Err(Error::MarkupNotAllowed);
    }

    let now = utils::now();
    let key = (affiliate_id, product_id);
    let existing = affiliate_product::Entity::find_by_id(key).one(&txn).await?;

    let mapping = match existing {
      Some(mapping) => {
        let final_price =
          utils::checked(mapping.base_price.checked_add(markup))?;
        affiliate_product::ActiveModel {
          markup: Set(markup),
          final_price: Set(final_price),
          is_active: Set(true),
          updated_at: Set(now),
          ..mapping.into()
        }
        .update(&txn)
        .await?
      }
      None => {
        let base_price = product.cost_basis();
        let final_price = utils::checked(base_price.checked_add(markup))?;
        affiliate_product::ActiveModel {
          affiliate_id: Set(affiliate_id),
          product_id: Set(product_id),
          base_price: Set(base_price),
          markup: Set(markup),
          final_price: Set(final_price),
          is_active: Set(true),
          created_at: Set(now),
          updated_at: Set(now),
        }
        .insert(&txn)
        .await?
      }
    };

    txn.commit().await?;

    debug!(
      "Affiliate #{} priced product #{} at {} (markup {})",
      affiliate_id,
      product_id,
      utils::format_money(mapping.final_price),
      utils::format_money(mapping.markup)
    );
    Ok(mapping)
  }

  pub async fn deactivate(
    &self,
    affiliate_id: i32,
    product_id: i32,
  ) -> Result<()> {
    let key = (affiliate_id, product_id);
    let mapping = affiliate_product::Entity::find_by_id(key)
      .one(self.db)
      .await?
      .ok_or(Error::ProductNotFound)?;

    affiliate_product::ActiveModel {
      is_active: Set(false),
      updated_at: Set(utils::now()),
      ..mapping.into()
    }
    .update(self.db)
    .await?;

    Ok(())
  }

  pub async fn mappings(
    &self,
    affiliate_id: i32,
  ) -> Result<Vec<affiliate_product::Model>> {
    Ok(
      affiliate_product::Entity::find()
        .filter(affiliate_product::Column::AffiliateId.eq(affiliate_id))
        .filter(affiliate_product::Column::IsActive.eq(true))
        .all(self.db)
        .await?,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::AffiliateStatus,
    sv::test_utils::{seed, test_db},
  };

  #[tokio::test]
  async fn test_percentage_affiliate_gets_catalog_price() {
    let db = test_db::setup().await;
    let affiliate = seed::affiliate(
      &db,
      1,
      CommissionMode::Percentage,
      AffiliateStatus::Active,
    )
    .await;
    let product = seed::product(&db, 15_000, Some(10_000), true).await;

    let quote =
      Pricing::new(&db).price(affiliate.id, product.id).await.unwrap();

    assert_eq!(quote.price, 15_000);
    assert!(!quote.needs_setup);
  }

  #[tokio::test]
  async fn test_markup_affiliate_without_mapping_needs_setup() {
    let db = test_db::setup().await;
    let affiliate =
      seed::affiliate(&db, 1, CommissionMode::Markup, AffiliateStatus::Active)
        .await;
    let product = seed::product(&db, 15_000, Some(10_000), true).await;

    let quote =
      Pricing::new(&db).price(affiliate.id, product.id).await.unwrap();

    assert_eq!(quote.price, 15_000);
    assert!(quote.needs_setup);
  }

  #[tokio::test]
  async fn test_markup_mapping_sets_price() {
    let db = test_db::setup().await;
    let affiliate =
      seed::affiliate(&db, 1, CommissionMode::Markup, AffiliateStatus::Active)
        .await;
    let product = seed::product(&db, 15_000, Some(10_000), true).await;
    let sv = Pricing::new(&db);

    let mapping = sv
      .create_affiliate_product(affiliate.id, product.id, 2_500)
      .await
      .unwrap();
    assert_eq!(mapping.base_price, 10_000);
    assert_eq!(mapping.final_price, mapping.base_price + mapping.markup);

    let quote = sv.price(affiliate.id, product.id).await.unwrap();
    assert_eq!(quote.price, 12_500);
    assert!(!quote.needs_setup);
  }

  #[tokio::test]
  async fn test_markup_overflow_is_rejected() {
    let db = test_db::setup().await;
    let affiliate =
      seed::affiliate(&db, 1, CommissionMode::Markup, AffiliateStatus::Active)
        .await;
    let product = seed::product(&db, 15_000, Some(10_000), true).await;
    let sv = Pricing::new(&db);

    let err = sv
      .create_affiliate_product(affiliate.id, product.id, i64::MAX)
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(sv.mappings(affiliate.id).await.unwrap().is_empty());

    // same guard on the update path
    sv.create_affiliate_product(affiliate.id, product.id, 500).await.unwrap();
    let err = sv
      .create_affiliate_product(affiliate.id, product.id, i64::MAX)
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(sv.price(affiliate.id, product.id).await.unwrap().price, 10_500);
  }

  #[tokio::test]
  async fn test_update_keeps_pinned_base_price() {
    let db = test_db::setup().await;
    let affiliate =
      seed::affiliate(&db, 1, CommissionMode::Markup, AffiliateStatus::Active)
        .await;
    let product = seed::product(&db, 15_000, Some(10_000), true).await;
    let sv = Pricing::new(&db);

    sv.create_affiliate_product(affiliate.id, product.id, 1_000).await.unwrap();

    product::ActiveModel {
      base_price: Set(Some(12_000)),
      ..product.clone().into()
    }
    .update(&db)
    .await
    .unwrap();

    let mapping = sv
      .create_affiliate_product(affiliate.id, product.id, 3_000)
      .await
      .unwrap();

    assert_eq!(mapping.base_price, 10_000);
    assert_eq!(mapping.final_price, 13_000);
  }

  #[tokio::test]
  async fn test_base_price_falls_back_to_price() {
    let db = test_db::setup().await;
    let affiliate =
      seed::affiliate(&db, 1, CommissionMode::Markup, AffiliateStatus::Active)
        .await;
    let product = seed::product(&db, 8_000, None, true).await;

    let mapping = Pricing::new(&db)
      .create_affiliate_product(affiliate.id, product.id, 500)
      .await
      .unwrap();

    assert_eq!(mapping.base_price, 8_000);
    assert_eq!(mapping.final_price, 8_500);
  }

  #[tokio::test]
  async fn test_markup_not_allowed() {
    let db = test_db::setup().await;
    let affiliate =
      seed::affiliate(&db, 1, CommissionMode::Markup, AffiliateStatus::Active)
        .await;
    let product = seed::product(&db, 15_000, Some(10_000), false).await;

    let err = Pricing::new(&db)
      .create_affiliate_product(affiliate.id, product.id, 1_000)
      .await
      .unwrap_err();

    assert!(matches!(err, Error::MarkupNotAllowed));
  }

  #[tokio::test]
  async fn test_deactivated_mapping_needs_setup_again() {
    let db = test_db::setup().await;
    let affiliate =
      seed::affiliate(&db, 1, CommissionMode::Markup, AffiliateStatus::Active)
        .await;
    let product = seed::product(&db, 15_000, Some(10_000), true).await;
    let sv = Pricing::new(&db);

    sv.create_affiliate_product(affiliate.id, product.id, 1_000).await.unwrap();
    sv.deactivate(affiliate.id, product.id).await.unwrap();

    assert!(sv.price(affiliate.id, product.id).await.unwrap().needs_setup);
    assert!(sv.mappings(affiliate.id).await.unwrap().is_empty());
  }
}
