use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

use super::{affiliate, commission};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  #[sea_orm(string_value = "bank_transfer")]
  BankTransfer,
  #[sea_orm(string_value = "paypal")]
  Paypal,
  #[sea_orm(string_value = "crypto")]
  Crypto,
}

/// Where the money goes. Stored as typed JSON next to `payment_method`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[derive(FromJsonQueryResult)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
  BankTransfer { account_name: String, iban: String },
  Paypal { email: String },
  Crypto { network: String, address: String },
}

impl PaymentDetails {
  pub fn method(&self) -> PaymentMethod {
    match self {
      Self::BankTransfer { .. } => PaymentMethod::BankTransfer,
      Self::Paypal { .. } => PaymentMethod::Paypal,
      Self::Crypto { .. } => PaymentMethod::Crypto,
    }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
  #[sea_orm(string_value = "pending")]
  #[default]
  Pending,
  #[sea_orm(string_value = "paid_external")]
  PaidExternal,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affiliate_payouts")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub affiliate_id: i32,
  pub amount: i64,
  pub payment_method: PaymentMethod,
  #[sea_orm(column_type = "Json")]
  pub payment_details: PaymentDetails,
  pub status: PayoutStatus,
  pub transaction_id: Option<String>,
  pub external_reference: Option<String>,
  pub processed_at: Option<DateTime>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "affiliate::Entity",
    from = "Column::AffiliateId",
    to = "affiliate::Column::Id"
  )]
  Affiliate,
  #[sea_orm(has_many = "commission::Entity")]
  Commissions,
}

impl Related<affiliate::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Affiliate.def()
  }
}

impl Related<commission::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Commissions.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
