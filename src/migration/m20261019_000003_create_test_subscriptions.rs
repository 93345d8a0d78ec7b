//! Migration: Create test_subscriptions table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE test_subscriptions (
                    id UUID PRIMARY KEY,
                    test_name VARCHAR(255) NOT NULL,
                    email VARCHAR(320) NOT NULL,
                    notifications_enabled BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    UNIQUE (test_name, email)
                );

                CREATE INDEX idx_test_subscriptions_test_name ON test_subscriptions(test_name)
                    WHERE notifications_enabled;
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS test_subscriptions;")
            .await?;

        Ok(())
    }
}
