use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub company_id: i64,
  pub name: String,
  pub price: i64,
  pub base_price: Option<i64>,
  pub allow_affiliate_markup: bool,
  pub created_at: DateTime,
}

impl Model {
  /// Platform cost an affiliate markup is stacked on.
  pub fn cost_basis(&self) -> i64 {
    self.base_price.unwrap_or(self.price)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
