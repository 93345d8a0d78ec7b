//! Database queries for test statuses.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, IsolationLevel, QuerySelect, Set, TransactionTrait};

use crate::entity::test_status::{self as status, ActiveModel, Entity as TestStatusEntity};
use crate::models::TestStatus;
use crate::store::{StatusDecision, StoreError, StoreResult, TxnOutcome};

use super::{classify_db_err, DbPool};

impl DbPool {
    /// Get the status of a test.
    pub async fn get_test_status(&self, test_name: &str) -> StoreResult<Option<TestStatus>> {
        let row = TestStatusEntity::find_by_id(test_name.to_string())
            .one(self.connection())
            .await
            .map_err(classify_db_err)?;

        row.map(model_to_status).transpose()
    }

    /// Read-modify-write the status of a test in a serializable transaction.
    ///
    /// The row is locked for the duration of the transaction; a concurrent
    /// writer surfaces as a serialization failure and maps to a conflict.
    pub async fn update_test_status(
        &self,
        test_name: &str,
        decide: StatusDecision<'_>,
    ) -> StoreResult<TxnOutcome> {
        let txn = self
            .connection()
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(classify_db_err)?;

        let current = TestStatusEntity::find_by_id(test_name.to_string())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(classify_db_err)?
            .map(model_to_status)
            .transpose()?;

        let Some(next) = decide(current.as_ref()) else {
            txn.rollback().await.map_err(classify_db_err)?;
            return Ok(TxnOutcome::Unchanged);
        };

        let model = ActiveModel {
            test_name: Set(next.test_name.clone()),
            timestamp: Set(next.timestamp),
            passing_count: Set(i32::try_from(next.passing_count).unwrap_or(i32::MAX)),
            failing_count: Set(i32::try_from(next.failing_count).unwrap_or(i32::MAX)),
            failing_cases: Set(next.failing_cases_json()),
            updated_at: Set(Utc::now()),
        };

        TestStatusEntity::insert(model)
            .on_conflict(
                OnConflict::column(status::Column::TestName)
                    .update_columns([
                        status::Column::Timestamp,
                        status::Column::PassingCount,
                        status::Column::FailingCount,
                        status::Column::FailingCases,
                        status::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await
            .map_err(classify_db_err)?;

        txn.commit().await.map_err(classify_db_err)?;
        Ok(TxnOutcome::Written)
    }
}

fn model_to_status(row: status::Model) -> StoreResult<TestStatus> {
    let failing_cases = TestStatus::failing_cases_from_json(&row.failing_cases).map_err(|e| {
        StoreError::Corrupt(format!("status {} has invalid failing cases: {}", row.test_name, e))
    })?;
    let passing_count = u32::try_from(row.passing_count).map_err(|_| {
        StoreError::Corrupt(format!(
            "status {} has negative passing count",
            row.test_name
        ))
    })?;

    Ok(TestStatus::with_results(
        row.test_name,
        row.timestamp,
        passing_count,
        failing_cases,
    ))
}
