use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::affiliate;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ReferralSource {
  #[sea_orm(string_value = "link")]
  #[default]
  Link,
  #[sea_orm(string_value = "cookie")]
  Cookie,
  #[sea_orm(string_value = "social")]
  Social,
  #[sea_orm(string_value = "email")]
  Email,
  #[sea_orm(string_value = "other")]
  Other,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affiliate_referrals")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub affiliate_id: i32,
  pub customer_id: Option<i64>,
  pub referral_code: String,
  pub ip_address: String,
  pub user_agent: Option<String>,
  pub landing_url: Option<String>,
  pub source: ReferralSource,
  /// `affiliate:visitor:bucket`, unique per cooldown window.
  #[sea_orm(unique)]
  #[serde(skip)]
  pub dedup_key: String,
  pub converted: bool,
  pub converted_at: Option<DateTime>,
  pub order_id: Option<i32>,
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
}

impl Related<affiliate::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Affiliate.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
