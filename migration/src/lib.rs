pub use sea_orm_migration::prelude::*;

mod m20261016_000001_create_affiliates;
mod m20261016_000002_create_catalog;
mod m20261016_000003_create_ledger;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261016_000001_create_affiliates::Migration),
      Box::new(m20261016_000002_create_catalog::Migration),
      Box::new(m20261016_000003_create_ledger::Migration),
    ]
  }
}
