//! In-memory result store.
//!
//! Records live in flat tables keyed by `(test_name, run_id)` and batch id,
//! with parent links as plain id fields. Status transactions are optimistic:
//! the status version is captured on read and re-checked before the write.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::warn;

use super::{ResultStore, RunRangeQuery, StatusDecision, StoreError, StoreResult, TxnOutcome};
use crate::models::{TestCaseBatch, TestRun, TestStatus};
use crate::services::subscribers::SubscriberDirectory;

#[derive(Debug, Clone)]
struct VersionedStatus {
    version: u64,
    status: TestStatus,
}

#[derive(Default)]
struct Tables {
    /// `None` marks a run record that cannot be decoded
    runs: BTreeMap<(String, i64), Option<TestRun>>,
    /// Batches are kept in their stored JSON form and decoded on read
    batches: HashMap<i64, JsonValue>,
    statuses: HashMap<String, VersionedStatus>,
    subscribers: HashMap<String, Vec<String>>,
    status_writes: u64,
}

#[derive(Default)]
struct Faults {
    conflicts: u32,
    outages: u32,
}

/// Arena-style store used by tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_run(&self, run: TestRun) {
        self.tables()
            .runs
            .insert((run.test_name.clone(), run.run_id), Some(run));
    }

    /// Register a run record that exists but cannot be decoded.
    pub fn insert_malformed_run(&self, test_name: &str, run_id: i64) {
        self.tables()
            .runs
            .insert((test_name.to_string(), run_id), None);
    }

    pub fn insert_batch(&self, batch: &TestCaseBatch) {
        self.tables().batches.insert(batch.id, batch.to_json());
    }

    /// Store an arbitrary payload under a batch id, valid or not.
    pub fn insert_raw_batch(&self, id: i64, payload: JsonValue) {
        self.tables().batches.insert(id, payload);
    }

    /// Seed a status directly, outside of any transaction.
    pub fn put_status(&self, status: TestStatus) {
        let mut tables = self.tables();
        let version = tables
            .statuses
            .get(&status.test_name)
            .map(|s| s.version + 1)
            .unwrap_or(1);
        tables
            .statuses
            .insert(status.test_name.clone(), VersionedStatus { version, status });
    }

    pub fn status(&self, test_name: &str) -> Option<TestStatus> {
        self.tables()
            .statuses
            .get(test_name)
            .map(|s| s.status.clone())
    }

    /// Number of statuses persisted through `update_status`.
    pub fn status_writes(&self) -> u64 {
        self.tables().status_writes
    }

    pub fn subscribe(&self, test_name: &str, email: &str) {
        self.tables()
            .subscribers
            .entry(test_name.to_string())
            .or_default()
            .push(email.to_string());
    }

    /// Make the next `n` status transactions fail their commit with a conflict.
    pub fn inject_conflicts(&self, n: u32) {
        self.faults().conflicts = n;
    }

    /// Make the next `n` status transactions fail as if the store were down.
    pub fn inject_outages(&self, n: u32) {
        self.faults().outages = n;
    }

    fn take_outage(&self) -> bool {
        let mut faults = self.faults();
        if faults.outages > 0 {
            faults.outages -= 1;
            true
        } else {
            false
        }
    }

    fn take_conflict(&self) -> bool {
        let mut faults = self.faults();
        if faults.conflicts > 0 {
            faults.conflicts -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn get_status(&self, test_name: &str) -> StoreResult<Option<TestStatus>> {
        Ok(self.status(test_name))
    }

    async fn find_runs(&self, query: &RunRangeQuery) -> StoreResult<Vec<TestRun>> {
        if query.after >= query.until {
            return Ok(Vec::new());
        }
        let tables = self.tables();
        let lower = (query.test_name.clone(), query.after + 1);
        let upper = (query.test_name.clone(), query.until);

        let mut runs = Vec::new();
        let candidates = tables
            .runs
            .range(lower..=upper)
            .rev()
            .filter(|(_, run)| {
                run.as_ref()
                    .is_none_or(|r| query.run_types.contains(&r.run_type))
            })
            .take(query.limit as usize);
        for ((test_name, run_id), run) in candidates {
            match run {
                Some(run) => runs.push(run.clone()),
                None => warn!("Invalid test run detected: {}:{}", test_name, run_id),
            }
        }
        Ok(runs)
    }

    async fn get_batches(&self, ids: &[i64]) -> StoreResult<HashMap<i64, TestCaseBatch>> {
        let tables = self.tables();
        let mut batches = HashMap::new();
        for id in ids {
            let Some(payload) = tables.batches.get(id) else {
                warn!("Test case batch missing: {}", id);
                continue;
            };
            match TestCaseBatch::from_json(*id, payload) {
                Ok(batch) => {
                    batches.insert(*id, batch);
                }
                Err(e) => warn!("Invalid test case batch {}: {}", id, e),
            }
        }
        Ok(batches)
    }

    async fn update_status(
        &self,
        test_name: &str,
        decide: StatusDecision<'_>,
    ) -> StoreResult<TxnOutcome> {
        if self.take_outage() {
            return Err(StoreError::Unavailable(format!(
                "status transaction for {} timed out",
                test_name
            )));
        }

        let (snapshot, read_version) = {
            let tables = self.tables();
            match tables.statuses.get(test_name) {
                Some(s) => (Some(s.status.clone()), s.version),
                None => (None, 0),
            }
        };

        let decision = decide(snapshot.as_ref());

        // Let concurrent transactions interleave between read and write.
        tokio::task::yield_now().await;

        let mut tables = self.tables();
        let current_version = tables
            .statuses
            .get(test_name)
            .map(|s| s.version)
            .unwrap_or(0);
        if current_version != read_version || self.take_conflict() {
            return Err(StoreError::Conflict(format!(
                "status for {} was modified concurrently",
                test_name
            )));
        }

        match decision {
            Some(status) => {
                tables.statuses.insert(
                    test_name.to_string(),
                    VersionedStatus {
                        version: read_version + 1,
                        status,
                    },
                );
                tables.status_writes += 1;
                Ok(TxnOutcome::Written)
            }
            None => Ok(TxnOutcome::Unchanged),
        }
    }
}

#[async_trait]
impl SubscriberDirectory for MemoryStore {
    async fn subscribers(&self, test_name: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .tables()
            .subscribers
            .get(test_name)
            .cloned()
            .unwrap_or_default())
    }
}
