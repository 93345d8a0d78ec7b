//! Test run entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub test_name: String,
    /// Start timestamp in microseconds, doubles as the run identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub run_id: i64,
    pub end_timestamp: i64,
    /// presubmit, postsubmit or other
    pub run_type: String,
    pub pass_count: i64,
    pub fail_count: i64,
    /// Ordered ids of the test case batches of this run
    #[sea_orm(column_type = "JsonBinary")]
    pub test_case_ids: JsonValue,
    #[sea_orm(column_type = "JsonBinary")]
    pub build_ids: JsonValue,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
