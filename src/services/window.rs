//! Run window fetching.
//!
//! Loads the runs of one test between the last processed run and a newly
//! completed run, newest first, together with their test case batches. Also
//! resolves the failing references of the previous status back into names.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::config::AlertConfig;
use crate::models::{RunKey, TestCaseBatch, TestCaseReference, TestRun, TestStatus};
use crate::store::{ResultStore, RunRangeQuery, StoreResult};

/// A run in the window with its resolved test case batches.
#[derive(Debug, Clone)]
pub struct WindowRun {
    pub run: TestRun,
    /// Batches in the order the run references them; unresolvable ones are left out
    pub batches: Vec<TestCaseBatch>,
}

impl WindowRun {
    pub fn new(run: TestRun, batches: Vec<TestCaseBatch>) -> Self {
        WindowRun { run, batches }
    }
}

/// Bounded set of runs considered when classifying the newest run.
#[derive(Debug, Clone, Default)]
pub struct RunWindow {
    /// Newest first
    pub runs: Vec<WindowRun>,
}

impl RunWindow {
    pub fn new(runs: Vec<WindowRun>) -> Self {
        RunWindow { runs }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn newest(&self) -> Option<&WindowRun> {
        self.runs.first()
    }

    /// De-duplicated build identifiers observed across the window.
    pub fn build_ids(&self) -> BTreeSet<String> {
        self.runs
            .iter()
            .flat_map(|r| r.run.build_ids.iter())
            .filter(|id| !id.is_empty())
            .cloned()
            .collect()
    }
}

/// Range query for the window ending at `key`.
///
/// The span is `min(run_id - status.timestamp, lookback)`, covering
/// identifiers in `(run_id - span, run_id]`.
pub fn window_query(key: &RunKey, status: &TestStatus, config: &AlertConfig) -> RunRangeQuery {
    let span = key
        .run_id
        .saturating_sub(status.timestamp)
        .min(config.lookback_micros())
        .max(0);
    RunRangeQuery {
        test_name: key.test_name.clone(),
        after: key.run_id - span,
        until: key.run_id,
        run_types: config.run_types.clone(),
        limit: config.max_runs,
    }
}

/// Load the run window for a completed run. Read-only.
pub async fn fetch_window(
    store: &dyn ResultStore,
    key: &RunKey,
    status: &TestStatus,
    config: &AlertConfig,
) -> StoreResult<RunWindow> {
    let query = window_query(key, status, config);
    if query.after >= query.until {
        return Ok(RunWindow::default());
    }

    let runs = store.find_runs(&query).await?;
    let batch_ids: Vec<i64> = runs
        .iter()
        .flat_map(|r| r.test_case_ids.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let batches = store.get_batches(&batch_ids).await?;

    let runs: Vec<WindowRun> = runs
        .into_iter()
        .map(|run| {
            let resolved = run
                .test_case_ids
                .iter()
                .filter_map(|id| batches.get(id).cloned())
                .collect();
            WindowRun::new(run, resolved)
        })
        .collect();

    debug!(
        "Loaded {} runs and {} batches for {} in ({}, {}]",
        runs.len(),
        batches.len(),
        key.test_name,
        query.after,
        query.until
    );

    Ok(RunWindow::new(runs))
}

/// Map the failing references of `status` back to test case names.
///
/// References to missing batches or out-of-range offsets are logged and
/// dropped.
pub async fn resolve_failures(
    store: &dyn ResultStore,
    status: &TestStatus,
) -> StoreResult<HashMap<String, TestCaseReference>> {
    let mut failures = HashMap::new();
    if status.failing_cases.is_empty() {
        return Ok(failures);
    }

    let batch_ids: Vec<i64> = status
        .failing_cases
        .iter()
        .map(|r| r.batch_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let batches = store.get_batches(&batch_ids).await?;

    for reference in &status.failing_cases {
        let Some(batch) = batches.get(&reference.batch_id) else {
            continue;
        };
        match batch.get(reference.offset) {
            Some(case) => {
                failures.insert(case.name.clone(), *reference);
            }
            None => warn!(
                "Failing reference {}#{} is out of range for {}",
                reference.batch_id, reference.offset, status.test_name
            ),
        }
    }

    Ok(failures)
}
