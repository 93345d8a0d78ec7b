//! Diff classifier.
//!
//! Folds a newest-first run window into one effective result per test case,
//! then classifies every case against the failing set of the previous status.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::models::{TestCaseReference, TestCaseResult, TestStatus};
use crate::services::window::RunWindow;

/// Transition of a single test case relative to the previous status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    Passing,
    NewFailure,
    ContinuedFailure,
    Fixed,
    /// Passing in the newest run after failing earlier in the window
    Transient,
    /// Skipped in every run of the window while previously failing
    SkippedSinceFailing,
}

impl CaseOutcome {
    pub fn is_failing(&self) -> bool {
        matches!(
            self,
            Self::NewFailure | Self::ContinuedFailure | Self::SkippedSinceFailing
        )
    }
}

/// Case names per reportable outcome, sorted for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationBuckets {
    pub new_failures: BTreeSet<String>,
    pub continued_failures: BTreeSet<String>,
    pub fixed: BTreeSet<String>,
    pub transient: BTreeSet<String>,
    pub skipped_since_failing: BTreeSet<String>,
}

impl ClassificationBuckets {
    fn record(&mut self, name: &str, outcome: CaseOutcome) {
        let bucket = match outcome {
            CaseOutcome::Passing => return,
            CaseOutcome::NewFailure => &mut self.new_failures,
            CaseOutcome::ContinuedFailure => &mut self.continued_failures,
            CaseOutcome::Fixed => &mut self.fixed,
            CaseOutcome::Transient => &mut self.transient,
            CaseOutcome::SkippedSinceFailing => &mut self.skipped_since_failing,
        };
        bucket.insert(name.to_string());
    }
}

/// Output of classifying one run window.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Status to commit in place of the previous one
    pub status: TestStatus,
    pub buckets: ClassificationBuckets,
    /// Outcome of every case observed in the window
    pub outcomes: BTreeMap<String, CaseOutcome>,
    /// Build identifiers seen across the window's runs
    pub build_ids: BTreeSet<String>,
    /// Start time of the newest run, in microseconds
    pub newest_start: i64,
}

#[derive(Debug, Clone, Copy)]
struct CaseState {
    result: TestCaseResult,
    transient: bool,
}

/// Classify `window` against the failing cases of the previous status.
///
/// `previous_failures` maps case names to the references persisted in the
/// previous status. Returns `None` when the window holds no runs.
pub fn classify(
    test_name: &str,
    previous_failures: &HashMap<String, TestCaseReference>,
    window: &RunWindow,
) -> Option<Classification> {
    let newest = window.newest()?;

    let mut states: BTreeMap<String, CaseState> = BTreeMap::new();
    let mut breakages: HashMap<String, TestCaseReference> = HashMap::new();

    for (position, window_run) in window.runs.iter().enumerate() {
        let is_newest = position == 0;
        for batch in &window_run.batches {
            for (offset, case) in batch.test_cases.iter().enumerate() {
                let result = case.result;

                if is_newest {
                    states.insert(
                        case.name.clone(),
                        CaseState {
                            result,
                            transient: false,
                        },
                    );
                } else {
                    match states.get_mut(&case.name) {
                        None => {
                            states.insert(
                                case.name.clone(),
                                CaseState {
                                    result,
                                    transient: false,
                                },
                            );
                        }
                        Some(state) if state.result.is_skip() => state.result = result,
                        Some(state) if state.result.is_pass() && result.is_failure() => {
                            state.transient = true
                        }
                        Some(_) => {}
                    }
                }

                if result.is_failure() {
                    breakages
                        .entry(case.name.clone())
                        .or_insert_with(|| TestCaseReference::new(batch.id, offset as u32));
                }
            }
        }
    }

    let mut buckets = ClassificationBuckets::default();
    let mut outcomes = BTreeMap::new();
    let mut failing_cases = Vec::new();
    let mut passing_count: u32 = 0;

    for (name, state) in &states {
        let prior = previous_failures.get(name);
        let outcome = match (state.result, prior) {
            (r, Some(reference)) if r.is_skip() => {
                failing_cases.push(*reference);
                CaseOutcome::SkippedSinceFailing
            }
            (r, None) if r.is_skip() => CaseOutcome::Passing,
            (r, _) if r.is_pass() && state.transient => CaseOutcome::Transient,
            (r, Some(_)) if r.is_pass() => CaseOutcome::Fixed,
            (r, None) if r.is_pass() => CaseOutcome::Passing,
            (_, Some(reference)) => {
                failing_cases.push(*reference);
                CaseOutcome::ContinuedFailure
            }
            (_, None) => {
                // A failing effective result always has a breakage entry.
                if let Some(reference) = breakages.get(name) {
                    failing_cases.push(*reference);
                }
                CaseOutcome::NewFailure
            }
        };

        if !outcome.is_failing() {
            passing_count += 1;
        }
        buckets.record(name, outcome);
        outcomes.insert(name.clone(), outcome);
    }

    debug!(
        "Classified {} cases for {}: {} new, {} continued, {} fixed, {} transient, {} skipped",
        outcomes.len(),
        test_name,
        buckets.new_failures.len(),
        buckets.continued_failures.len(),
        buckets.fixed.len(),
        buckets.transient.len(),
        buckets.skipped_since_failing.len()
    );

    Some(Classification {
        status: TestStatus::with_results(
            test_name,
            newest.run.run_id,
            passing_count,
            failing_cases,
        ),
        buckets,
        outcomes,
        build_ids: window.build_ids(),
        newest_start: newest.run.run_id,
    })
}
