//! Result store gateway.
//!
//! Read/write access to test runs, test case batches and test statuses. The
//! sea-orm `DbPool` is the production implementation; `memory::MemoryStore`
//! keeps the same contract in flat in-process tables.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::{RunType, TestCaseBatch, TestRun, TestStatus};

/// Errors surfaced by a store gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed; the transaction was rolled back
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Store temporarily unreachable or timed out
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Persisted record could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Any other backend failure
    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Conflicts and outages are worth another attempt; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ancestor-scoped range query over the runs of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRangeQuery {
    pub test_name: String,
    /// Exclusive lower bound on the run identifier
    pub after: i64,
    /// Inclusive upper bound on the run identifier
    pub until: i64,
    /// Only runs of these types are returned
    pub run_types: Vec<RunType>,
    /// Maximum number of runs to return
    pub limit: u64,
}

/// Result of a read-modify-write status transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnOutcome {
    /// The decided status was persisted and committed.
    Written,
    /// The decision declined to write; nothing changed.
    Unchanged,
}

/// Decision made inside a status transaction. Receives the currently
/// persisted status (if any) and returns the status to write, or `None` to
/// leave the record untouched.
pub type StatusDecision<'a> = &'a (dyn Fn(Option<&TestStatus>) -> Option<TestStatus> + Send + Sync);

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Point read of the status singleton for a test.
    async fn get_status(&self, test_name: &str) -> StoreResult<Option<TestStatus>>;

    /// Runs matching the query, newest first. Malformed runs are logged and
    /// left out rather than failing the query.
    async fn find_runs(&self, query: &RunRangeQuery) -> StoreResult<Vec<TestRun>>;

    /// Batches by id. Missing or undecodable batches are logged and absent
    /// from the returned map.
    async fn get_batches(&self, ids: &[i64]) -> StoreResult<HashMap<i64, TestCaseBatch>>;

    /// Atomically re-read the status for `test_name`, apply `decide` and
    /// persist its result. Either the whole status is written or nothing
    /// changes. Concurrent modification surfaces as `StoreError::Conflict`.
    async fn update_status(
        &self,
        test_name: &str,
        decide: StatusDecision<'_>,
    ) -> StoreResult<TxnOutcome>;
}
