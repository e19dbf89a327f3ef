use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate, product};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affiliate_products")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub affiliate_id: i32,
  #[sea_orm(primary_key, auto_increment = false)]
  pub product_id: i32,
  /// Pinned when the mapping is first created, never re-read from catalog.
  pub base_price: i64,
  pub markup: i64,
  pub final_price: i64,
  pub is_active: bool,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "affiliate::Entity",
    from = "Column::AffiliateId",
    to = "affiliate::Column::Id"
  )]
  Affiliate,
  #[sea_orm(
    belongs_to = "product::Entity",
    from = "Column::ProductId",
    to = "product::Column::Id"
  )]
  Product,
}

impl Related<affiliate::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Affiliate.def()
  }
}

impl Related<product::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Product.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
