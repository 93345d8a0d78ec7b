//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261019_000001_create_test_runs;
mod m20261019_000002_create_test_statuses;
mod m20261019_000003_create_test_subscriptions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_create_test_runs::Migration),
            Box::new(m20261019_000002_create_test_statuses::Migration),
            Box::new(m20261019_000003_create_test_subscriptions::Migration),
        ]
    }
}
