//! Migration: Create test_statuses table.

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
                CREATE TABLE test_statuses (
                    test_name VARCHAR(255) PRIMARY KEY,
                    timestamp BIGINT NOT NULL DEFAULT 0,  -- never decreases
                    passing_count INTEGER NOT NULL DEFAULT 0,
                    failing_count INTEGER NOT NULL DEFAULT 0,
                    failing_cases JSONB NOT NULL DEFAULT '[]'::jsonb,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TRIGGER update_test_statuses_updated_at
                    BEFORE UPDATE ON test_statuses
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_test_statuses_updated_at ON test_statuses;
                DROP TABLE IF EXISTS test_statuses;
                "#,
            )
            .await?;

        Ok(())
    }
}
