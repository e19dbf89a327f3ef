use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate_payout, order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionType {
  #[sea_orm(string_value = "affiliate")]
  Affiliate,
  #[sea_orm(string_value = "merchant")]
  Merchant,
  #[sea_orm(string_value = "platform")]
  Platform,
}

impl CommissionType {
  /// Ledger slot of a row inside its order, one row per slot.
  pub fn split_key(self, merchant_id: Option<i64>) -> String {
    match (self, merchant_id) {
      (Self::Merchant, Some(id)) => format!("merchant:{id}"),
      (Self::Merchant, None) => "merchant".into(),
      (Self::Affiliate, _) => "affiliate".into(),
      (Self::Platform, _) => "platform".into(),
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionStatus {
  #[sea_orm(string_value = "pending")]
  #[default]
  Pending,
  #[sea_orm(string_value = "confirmed")]
  Confirmed,
  #[sea_orm(string_value = "paid")]
  Paid,
  #[sea_orm(string_value = "cancelled")]
  Cancelled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commissions")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub order_id: i32,
  pub company_id: i64,
  pub affiliate_id: Option<i32>,
  pub merchant_id: Option<i64>,
  pub commission_type: CommissionType,
  /// See [`CommissionType::split_key`], unique together with `order_id`.
  #[serde(skip)]
  pub split_key: String,
  pub amount: i64,
  pub order_total: i64,
  pub status: CommissionStatus,
  /// Set once by payout allocation, never reassigned.
  pub payout_id: Option<i32>,
  pub paid_at: Option<DateTime>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "order::Entity",
    from = "Column::OrderId",
    to = "order::Column::Id"
  )]
  Order,
  #[sea_orm(
    belongs_to = "affiliate_payout::Entity",
    from = "Column::PayoutId",
    to = "affiliate_payout::Column::Id"
  )]
  Payout,
}

impl Related<order::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Order.def()
  }
}

impl Related<affiliate_payout::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Payout.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
