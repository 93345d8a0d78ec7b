//! Migration: Create test_runs and test_case_runs tables.
//!
//! Runs are keyed by (test_name, run_id); batches are addressed by id and
//! referenced from runs through test_case_ids.

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
                -- Shared trigger function for updated_at
                CREATE OR REPLACE FUNCTION update_updated_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;

                CREATE TABLE test_runs (
                    test_name VARCHAR(255) NOT NULL,
                    run_id BIGINT NOT NULL,              -- start timestamp in microseconds
                    end_timestamp BIGINT NOT NULL,
                    run_type VARCHAR(20) NOT NULL,
                    pass_count BIGINT NOT NULL DEFAULT 0,
                    fail_count BIGINT NOT NULL DEFAULT 0,
                    test_case_ids JSONB NOT NULL DEFAULT '[]'::jsonb,
                    build_ids JSONB NOT NULL DEFAULT '[]'::jsonb,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    PRIMARY KEY (test_name, run_id)
                );

                -- Window queries filter by type within a run_id range
                CREATE INDEX idx_test_runs_type ON test_runs(test_name, run_type, run_id DESC);

                CREATE TABLE test_case_runs (
                    id BIGINT PRIMARY KEY,
                    test_cases JSONB NOT NULL DEFAULT '[]'::jsonb,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
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
                DROP TABLE IF EXISTS test_case_runs;
                DROP TABLE IF EXISTS test_runs;
                DROP FUNCTION IF EXISTS update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }
}
