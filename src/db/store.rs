//! `ResultStore` backed by PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::{TestCaseBatch, TestRun, TestStatus};
use crate::store::{ResultStore, RunRangeQuery, StatusDecision, StoreResult, TxnOutcome};

use super::DbPool;

#[async_trait]
impl ResultStore for DbPool {
    async fn get_status(&self, test_name: &str) -> StoreResult<Option<TestStatus>> {
        self.get_test_status(test_name).await
    }

    async fn find_runs(&self, query: &RunRangeQuery) -> StoreResult<Vec<TestRun>> {
        if query.after >= query.until {
            return Ok(Vec::new());
        }
        self.find_runs_in_range(query).await
    }

    async fn get_batches(&self, ids: &[i64]) -> StoreResult<HashMap<i64, TestCaseBatch>> {
        self.find_test_case_batches(ids).await
    }

    async fn update_status(
        &self,
        test_name: &str,
        decide: StatusDecision<'_>,
    ) -> StoreResult<TxnOutcome> {
        self.update_test_status(test_name, decide).await
    }
}
