use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate_payout, affiliate_product, affiliate_referral};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionMode {
  #[sea_orm(string_value = "percentage")]
  #[default]
  Percentage,
  #[sea_orm(string_value = "markup")]
  Markup,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffiliateStatus {
  #[sea_orm(string_value = "pending")]
  #[default]
  Pending,
  #[sea_orm(string_value = "active")]
  Active,
  #[sea_orm(string_value = "suspended")]
  Suspended,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affiliates")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub user_id: i64,
  pub company_id: i64,
  #[sea_orm(unique)]
  pub affiliate_code: String,
  pub commission_mode: CommissionMode,
  /// Basis points, `1000` is 10%.
  pub commission_rate: i32,
  pub status: AffiliateStatus,
  pub total_clicks: i32,
  pub total_sales: i32,
  pub total_earnings: i64,
  pub paid_earnings: i64,
  pub pending_earnings: i64,
  pub conversion_rate: f64,
  pub min_payout: i64,
  /// Bumped by every payout allocation.
  pub version: i32,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "affiliate_referral::Entity")]
  Referrals,
  #[sea_orm(has_many = "affiliate_product::Entity")]
  Products,
  #[sea_orm(has_many = "affiliate_payout::Entity")]
  Payouts,
}

impl Related<affiliate_referral::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Referrals.def()
  }
}

impl Related<affiliate_product::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Products.def()
  }
}

impl Related<affiliate_payout::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Payouts.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
