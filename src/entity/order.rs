use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate, commission, order_item};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub company_id: i64,
  pub customer_id: Option<i64>,
  pub affiliate_id: Option<i32>,
  pub referral_id: Option<i32>,
  /// Sum of `sell_price * quantity`, shipping excluded.
  pub subtotal: i64,
  pub shipping: i64,
  pub total: i64,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "order_item::Entity")]
  Items,
  #[sea_orm(has_many = "commission::Entity")]
  Commissions,
  #[sea_orm(
    belongs_to = "affiliate::Entity",
    from = "Column::AffiliateId",
    to = "affiliate::Column::Id"
  )]
  Affiliate,
}

impl Related<order_item::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Items.def()
  }
}

impl Related<commission::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Commissions.def()
  }
}

impl Related<affiliate::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Affiliate.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
