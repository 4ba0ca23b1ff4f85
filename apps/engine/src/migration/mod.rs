//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_reference_tables;
mod m20260301_000002_create_execution_tables;
mod m20260301_000003_create_problems;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_reference_tables::Migration),
            Box::new(m20260301_000002_create_execution_tables::Migration),
            Box::new(m20260301_000003_create_problems::Migration),
        ]
    }
}
