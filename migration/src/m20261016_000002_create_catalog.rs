use sea_orm_migration::prelude::*;

use super::m20261016_000001_create_affiliates::Affiliates;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Products::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Products::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Products::CompanyId).big_integer().not_null())
          .col(ColumnDef::new(Products::Name).string().not_null())
          .col(ColumnDef::new(Products::Price).big_integer().not_null())
          .col(ColumnDef::new(Products::BasePrice).big_integer().null())
          .col(
            ColumnDef::new(Products::AllowAffiliateMarkup)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Products::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(AffiliateProducts::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(AffiliateProducts::AffiliateId).integer().not_null(),
          )
          .col(
            ColumnDef::new(AffiliateProducts::ProductId).integer().not_null(),
          )
          .col(
            ColumnDef::new(AffiliateProducts::BasePrice)
              .big_integer()
              .not_null(),
          )
          .col(
            ColumnDef::new(AffiliateProducts::Markup).big_integer().not_null(),
          )
          .col(
            ColumnDef::new(AffiliateProducts::FinalPrice)
              .big_integer()
              .not_null(),
          )
          .col(
            ColumnDef::new(AffiliateProducts::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(AffiliateProducts::CreatedAt).date_time().not_null(),
          )
          .col(
            ColumnDef::new(AffiliateProducts::UpdatedAt).date_time().not_null(),
          )
          .primary_key(
            Index::create()
              .col(AffiliateProducts::AffiliateId)
              .col(AffiliateProducts::ProductId),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_affiliate_products_affiliate")
              .from(AffiliateProducts::Table, AffiliateProducts::AffiliateId)
              .to(Affiliates::Table, Affiliates::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_affiliate_products_product")
              .from(AffiliateProducts::Table, AffiliateProducts::ProductId)
              .to(Products::Table, Products::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Orders::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Orders::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Orders::CompanyId).big_integer().not_null())
          .col(ColumnDef::new(Orders::CustomerId).big_integer().null())
          .col(ColumnDef::new(Orders::AffiliateId).integer().null())
          .col(ColumnDef::new(Orders::ReferralId).integer().null())
          .col(ColumnDef::new(Orders::Subtotal).big_integer().not_null())
          .col(ColumnDef::new(Orders::Shipping).big_integer().not_null())
          .col(ColumnDef::new(Orders::Total).big_integer().not_null())
          .col(ColumnDef::new(Orders::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_orders_affiliate")
              .from(Orders::Table, Orders::AffiliateId)
              .to(Affiliates::Table, Affiliates::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(OrderItems::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(OrderItems::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
          .col(ColumnDef::new(OrderItems::ProductId).integer().not_null())
          .col(ColumnDef::new(OrderItems::MerchantId).big_integer().null())
          .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
          .col(ColumnDef::new(OrderItems::SellPrice).big_integer().not_null())
          .col(ColumnDef::new(OrderItems::BasePrice).big_integer().not_null())
          .col(
            ColumnDef::new(OrderItems::MerchantPrice).big_integer().not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_order_items_order")
              .from(OrderItems::Table, OrderItems::OrderId)
              .to(Orders::Table, Orders::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_order_items_order")
          .table(OrderItems::Table)
          .col(OrderItems::OrderId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(OrderItems::Table).to_owned())
      .await?;

    manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await?;

    manager
      .drop_table(Table::drop().table(AffiliateProducts::Table).to_owned())
      .await?;

    manager.drop_table(Table::drop().table(Products::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Products {
  Table,
  Id,
  CompanyId,
  Name,
  Price,
  BasePrice,
  AllowAffiliateMarkup,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum AffiliateProducts {
  Table,
  AffiliateId,
  ProductId,
  BasePrice,
  Markup,
  FinalPrice,
  IsActive,
  CreatedAt,
  UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Orders {
  Table,
  Id,
  CompanyId,
  CustomerId,
  AffiliateId,
  ReferralId,
  Subtotal,
  Shipping,
  Total,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum OrderItems {
  Table,
  Id,
  OrderId,
  ProductId,
  MerchantId,
  Quantity,
  SellPrice,
  BasePrice,
  MerchantPrice,
}
