//! Shared test utilities for database setup

#[cfg(test)]
pub mod test_db {
  use migration::{Migrator, MigratorTrait};
  use sea_orm::{Database, DatabaseConnection};

  /// Creates an in-memory SQLite database migrated to the latest schema, so
  /// tests run against the same indexes and foreign keys as production
  pub async fn setup() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
  }

  #[tokio::test]
  async fn test_migrations_revert_cleanly() {
    let db = setup().await;
    assert_eq!(Migrator::get_applied_migrations(&db).await.unwrap().len(), 3);

    Migrator::down(&db, None).await.unwrap();
    assert!(Migrator::get_applied_migrations(&db).await.unwrap().is_empty());

    Migrator::up(&db, None).await.unwrap();
    assert!(Migrator::get_pending_migrations(&db).await.unwrap().is_empty());
  }
}

/// Rows inserted straight into the tables, bypassing the services.
#[cfg(test)]
pub mod seed {
  use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, Set};

  use crate::{entity::*, utils};

  pub async fn affiliate(
    db: &DatabaseConnection,
    user_id: i64,
    mode: CommissionMode,
    status: AffiliateStatus,
  ) -> affiliate::Model {
    affiliate::ActiveModel {
      id: NotSet,
      user_id: Set(user_id),
      company_id: Set(1),
      affiliate_code: Set(format!("AFF{user_id}")),
      commission_mode: Set(mode),
      commission_rate: Set(1000),
      status: Set(status),
      total_clicks: Set(0),
      total_sales: Set(0),
      total_earnings: Set(0),
      paid_earnings: Set(0),
      pending_earnings: Set(0),
      conversion_rate: Set(0.0),
      min_payout: Set(0),
      version: Set(0),
      created_at: Set(utils::now()),
    }
    .insert(db)
    .await
    .unwrap()
  }

  pub async fn product(
    db: &DatabaseConnection,
    price: i64,
    base_price: Option<i64>,
    allow_affiliate_markup: bool,
  ) -> product::Model {
    product::ActiveModel {
      id: NotSet,
      company_id: Set(1),
      name: Set("Widget".into()),
      price: Set(price),
      base_price: Set(base_price),
      allow_affiliate_markup: Set(allow_affiliate_markup),
      created_at: Set(utils::now()),
    }
    .insert(db)
    .await
    .unwrap()
  }

  /// `(product_id, merchant_id, quantity, sell, base, merchant)`
  pub type Line = (i32, Option<i64>, i32, i64, i64, i64);

  pub async fn order(
    db: &DatabaseConnection,
    affiliate_id: Option<i32>,
    lines: &[Line],
  ) -> order::Model {
    let subtotal: i64 =
      lines.iter().map(|&(_, _, qty, sell, ..)| sell * qty as i64).sum();

    let order = order::ActiveModel {
      id: NotSet,
      company_id: Set(1),
      customer_id: Set(None),
      affiliate_id: Set(affiliate_id),
      referral_id: Set(None),
      subtotal: Set(subtotal),
      shipping: Set(0),
      total: Set(subtotal),
      created_at: Set(utils::now()),
    }
    .insert(db)
    .await
    .unwrap();

    for &(product_id, merchant_id, quantity, sell, base, merchant) in lines {
      order_item::ActiveModel {
        id: NotSet,
        order_id: Set(order.id),
        product_id: Set(product_id),
        merchant_id: Set(merchant_id),
        quantity: Set(quantity),
        sell_price: Set(sell),
        base_price: Set(base),
        merchant_price: Set(merchant),
      }
      .insert(db)
      .await
      .unwrap();
    }

    order
  }

  /// Affiliate commission created `age_secs` seconds ago, on an order of its
  /// own since an order holds one affiliate row.
  pub async fn commission(
    db: &DatabaseConnection,
    affiliate_id: i32,
    amount: i64,
    status: CommissionStatus,
    age_secs: i64,
  ) -> commission::Model {
    let order = order(db, Some(affiliate_id), &[]).await;

    commission::ActiveModel {
      id: NotSet,
      order_id: Set(order.id),
      company_id: Set(1),
      affiliate_id: Set(Some(affiliate_id)),
      merchant_id: Set(None),
      commission_type: Set(CommissionType::Affiliate),
      split_key: Set(CommissionType::Affiliate.split_key(None)),
      amount: Set(amount),
      order_total: Set(amount),
      status: Set(status),
      payout_id: Set(None),
      paid_at: Set(None),
      created_at: Set(utils::now() - chrono::TimeDelta::seconds(age_secs)),
    }
    .insert(db)
    .await
    .unwrap()
  }
}
