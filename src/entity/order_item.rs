use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::order;

/// Price snapshot taken at sale time. Rows are written once with the order
/// and never updated, so catalog changes cannot reach past commissions.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub order_id: i32,
  pub product_id: i32,
  pub merchant_id: Option<i64>,
  pub quantity: i32,
  pub sell_price: i64,
  pub base_price: i64,
  pub merchant_price: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "order::Entity",
    from = "Column::OrderId",
    to = "order::Column::Id"
  )]
  Order,
}

impl Related<order::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Order.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
