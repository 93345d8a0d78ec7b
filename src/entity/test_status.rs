//! Test status entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_statuses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub test_name: String,
    /// Run identifier of the most recently processed run
    pub timestamp: i64,
    pub passing_count: i32,
    pub failing_count: i32,
    /// Array of `{batch_id, offset}` references
    #[sea_orm(column_type = "JsonBinary")]
    pub failing_cases: JsonValue,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
