use sea_orm_migration::prelude::*;

use super::{
  m20261016_000001_create_affiliates::Affiliates,
  m20261016_000002_create_catalog::Orders,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(AffiliatePayouts::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(AffiliatePayouts::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(AffiliatePayouts::AffiliateId).integer().not_null(),
          )
          .col(
            ColumnDef::new(AffiliatePayouts::Amount).big_integer().not_null(),
          )
          .col(
            ColumnDef::new(AffiliatePayouts::PaymentMethod).string().not_null(),
          )
          .col(
            ColumnDef::new(AffiliatePayouts::PaymentDetails).json().not_null(),
          )
          .col(
            ColumnDef::new(AffiliatePayouts::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(AffiliatePayouts::TransactionId).string().null())
          .col(
            ColumnDef::new(AffiliatePayouts::ExternalReference).string().null(),
          )
          .col(
            ColumnDef::new(AffiliatePayouts::ProcessedAt).date_time().null(),
          )
          .col(
            ColumnDef::new(AffiliatePayouts::CreatedAt).date_time().not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_affiliate_payouts_affiliate")
              .from(AffiliatePayouts::Table, AffiliatePayouts::AffiliateId)
              .to(Affiliates::Table, Affiliates::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Commissions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Commissions::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Commissions::OrderId).integer().not_null())
          .col(ColumnDef::new(Commissions::CompanyId).big_integer().not_null())
          .col(ColumnDef::new(Commissions::AffiliateId).integer().null())
          .col(ColumnDef::new(Commissions::MerchantId).big_integer().null())
          .col(ColumnDef::new(Commissions::CommissionType).string().not_null())
          .col(ColumnDef::new(Commissions::SplitKey).string().not_null())
          .col(ColumnDef::new(Commissions::Amount).big_integer().not_null())
          .col(ColumnDef::new(Commissions::OrderTotal).big_integer().not_null())
          .col(
            ColumnDef::new(Commissions::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Commissions::PayoutId).integer().null())
          .col(ColumnDef::new(Commissions::PaidAt).date_time().null())
          .col(ColumnDef::new(Commissions::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_commissions_order")
              .from(Commissions::Table, Commissions::OrderId)
              .to(Orders::Table, Orders::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_commissions_payout")
              .from(Commissions::Table, Commissions::PayoutId)
              .to(AffiliatePayouts::Table, AffiliatePayouts::Id)
              .on_delete(ForeignKeyAction::Restrict),
          )
          .to_owned(),
      )
      .await?;

    // `merchant_id` is nullable, so slots are keyed by a non-null string
    manager
      .create_index(
        Index::create()
          .name("idx_commissions_order_split")
          .table(Commissions::Table)
          .col(Commissions::OrderId)
          .col(Commissions::SplitKey)
          .unique()
          .to_owned(),
      )
      .await?;

    // Serves both the stats recompute and the FIFO payout scan
    manager
      .create_index(
        Index::create()
          .name("idx_commissions_affiliate_status")
          .table(Commissions::Table)
          .col(Commissions::AffiliateId)
          .col(Commissions::Status)
          .col(Commissions::CreatedAt)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_commissions_company")
          .table(Commissions::Table)
          .col(Commissions::CompanyId)
          .col(Commissions::CreatedAt)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(CommissionJobs::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(CommissionJobs::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(CommissionJobs::OrderId).integer().not_null())
          .col(
            ColumnDef::new(CommissionJobs::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(
            ColumnDef::new(CommissionJobs::Attempts)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(CommissionJobs::LastError).string().null())
          .col(
            ColumnDef::new(CommissionJobs::AvailableAt).date_time().not_null(),
          )
          .col(ColumnDef::new(CommissionJobs::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(CommissionJobs::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_commission_jobs_order")
              .from(CommissionJobs::Table, CommissionJobs::OrderId)
              .to(Orders::Table, Orders::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_commission_jobs_order")
          .table(CommissionJobs::Table)
          .col(CommissionJobs::OrderId)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_commission_jobs_due")
          .table(CommissionJobs::Table)
          .col(CommissionJobs::Status)
          .col(CommissionJobs::AvailableAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(CommissionJobs::Table).to_owned())
      .await?;

    manager
      .drop_table(Table::drop().table(Commissions::Table).to_owned())
      .await?;

    manager
      .drop_table(Table::drop().table(AffiliatePayouts::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum AffiliatePayouts {
  Table,
  Id,
  AffiliateId,
  Amount,
  PaymentMethod,
  PaymentDetails,
  Status,
  TransactionId,
  ExternalReference,
  ProcessedAt,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum Commissions {
  Table,
  Id,
  OrderId,
  CompanyId,
  AffiliateId,
  MerchantId,
  CommissionType,
  SplitKey,
  Amount,
  OrderTotal,
  Status,
  PayoutId,
  PaidAt,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum CommissionJobs {
  Table,
  Id,
  OrderId,
  Status,
  Attempts,
  LastError,
  AvailableAt,
  CreatedAt,
  UpdatedAt,
}
