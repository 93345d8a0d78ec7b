//! Database queries for test runs and test case batches.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use tracing::warn;

use crate::entity::test_case_run::{self as batch, Entity as TestCaseRun};
use crate::entity::test_run::{self as run, Entity as TestRunEntity};
use crate::models::{RunType, TestCaseBatch, TestRun};
use crate::store::{RunRangeQuery, StoreResult};

use super::{classify_db_err, DbPool};

impl DbPool {
    /// Runs of one test in `(after, until]`, newest first.
    ///
    /// Rows that cannot be decoded are logged and skipped.
    pub async fn find_runs_in_range(&self, query: &RunRangeQuery) -> StoreResult<Vec<TestRun>> {
        let run_types: Vec<&str> = query.run_types.iter().map(|t| t.as_str()).collect();

        let rows = TestRunEntity::find()
            .filter(run::Column::TestName.eq(query.test_name.as_str()))
            .filter(run::Column::RunId.gt(query.after))
            .filter(run::Column::RunId.lte(query.until))
            .filter(run::Column::RunType.is_in(run_types))
            .order_by_desc(run::Column::RunId)
            .limit(query.limit)
            .all(self.connection())
            .await
            .map_err(classify_db_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let key = format!("{}:{}", row.test_name, row.run_id);
                let decoded = model_to_run(row);
                if decoded.is_none() {
                    warn!("Invalid test run detected: {}", key);
                }
                decoded
            })
            .collect())
    }

    /// Test case batches by id. Missing or undecodable batches are absent.
    pub async fn find_test_case_batches(
        &self,
        ids: &[i64],
    ) -> StoreResult<HashMap<i64, TestCaseBatch>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = TestCaseRun::find()
            .filter(batch::Column::Id.is_in(ids.iter().copied()))
            .all(self.connection())
            .await
            .map_err(classify_db_err)?;

        let mut batches = HashMap::with_capacity(rows.len());
        for row in rows {
            match TestCaseBatch::from_json(row.id, &row.test_cases) {
                Ok(b) => {
                    batches.insert(row.id, b);
                }
                Err(e) => warn!("Invalid test case batch {}: {}", row.id, e),
            }
        }
        for id in ids {
            if !batches.contains_key(id) {
                warn!("Test case batch missing: {}", id);
            }
        }

        Ok(batches)
    }
}

fn model_to_run(row: run::Model) -> Option<TestRun> {
    Some(TestRun {
        run_type: RunType::parse(&row.run_type)?,
        test_case_ids: serde_json::from_value(row.test_case_ids).ok()?,
        build_ids: serde_json::from_value(row.build_ids).ok()?,
        test_name: row.test_name,
        run_id: row.run_id,
        end_timestamp: row.end_timestamp,
        pass_count: row.pass_count,
        fail_count: row.fail_count,
    })
}
