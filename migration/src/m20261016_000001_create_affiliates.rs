use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Affiliates::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Affiliates::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Affiliates::UserId).big_integer().not_null())
          .col(ColumnDef::new(Affiliates::CompanyId).big_integer().not_null())
          .col(ColumnDef::new(Affiliates::AffiliateCode).string().not_null())
          .col(
            ColumnDef::new(Affiliates::CommissionMode)
              .string()
              .not_null()
              .default("percentage"),
          )
          .col(
            ColumnDef::new(Affiliates::CommissionRate)
              .integer()
              .not_null()
              .default(1000),
          )
          .col(
            ColumnDef::new(Affiliates::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(
            ColumnDef::new(Affiliates::TotalClicks)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Affiliates::TotalSales)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Affiliates::TotalEarnings)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Affiliates::PaidEarnings)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Affiliates::PendingEarnings)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Affiliates::ConversionRate)
              .double()
              .not_null()
              .default(0.0),
          )
          .col(
            ColumnDef::new(Affiliates::MinPayout)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Affiliates::Version)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Affiliates::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_affiliates_code")
          .table(Affiliates::Table)
          .col(Affiliates::AffiliateCode)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_affiliates_user")
          .table(Affiliates::Table)
          .col(Affiliates::UserId)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(AffiliateReferrals::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(AffiliateReferrals::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(AffiliateReferrals::AffiliateId)
              .integer()
              .not_null(),
          )
          .col(
            ColumnDef::new(AffiliateReferrals::CustomerId).big_integer().null(),
          )
          .col(
            ColumnDef::new(AffiliateReferrals::ReferralCode)
              .string()
              .not_null(),
          )
          .col(
            ColumnDef::new(AffiliateReferrals::IpAddress).string().not_null(),
          )
          .col(ColumnDef::new(AffiliateReferrals::UserAgent).string().null())
          .col(ColumnDef::new(AffiliateReferrals::LandingUrl).string().null())
          .col(
            ColumnDef::new(AffiliateReferrals::Source)
              .string()
              .not_null()
              .default("link"),
          )
          .col(
            ColumnDef::new(AffiliateReferrals::DedupKey).string().not_null(),
          )
          .col(
            ColumnDef::new(AffiliateReferrals::Converted)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(AffiliateReferrals::ConvertedAt).date_time().null(),
          )
          .col(ColumnDef::new(AffiliateReferrals::OrderId).integer().null())
          .col(
            ColumnDef::new(AffiliateReferrals::CreatedAt)
              .date_time()
              .not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_affiliate_referrals_affiliate")
              .from(AffiliateReferrals::Table, AffiliateReferrals::AffiliateId)
              .to(Affiliates::Table, Affiliates::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    // Concurrent clicks inside one cooldown bucket collapse onto this key
    manager
      .create_index(
        Index::create()
          .name("idx_affiliate_referrals_dedup")
          .table(AffiliateReferrals::Table)
          .col(AffiliateReferrals::DedupKey)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_affiliate_referrals_affiliate_created")
          .table(AffiliateReferrals::Table)
          .col(AffiliateReferrals::AffiliateId)
          .col(AffiliateReferrals::CreatedAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(AffiliateReferrals::Table).to_owned())
      .await?;

    manager.drop_table(Table::drop().table(Affiliates::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Affiliates {
  Table,
  Id,
  UserId,
  CompanyId,
  AffiliateCode,
  CommissionMode,
  CommissionRate,
  Status,
  TotalClicks,
  TotalSales,
  TotalEarnings,
  PaidEarnings,
  PendingEarnings,
  ConversionRate,
  MinPayout,
  Version,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum AffiliateReferrals {
  Table,
  Id,
  AffiliateId,
  CustomerId,
  ReferralCode,
  IpAddress,
  UserAgent,
  LandingUrl,
  Source,
  DedupKey,
  Converted,
  ConvertedAt,
  OrderId,
  CreatedAt,
}
