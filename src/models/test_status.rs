//! Per-test current health record.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Lightweight pointer to a failing case inside a test case batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct TestCaseReference {
    /// ID of the test case batch holding the case
    pub batch_id: i64,
    /// Position of the case within the batch
    pub offset: u32,
}

impl TestCaseReference {
    pub fn new(batch_id: i64, offset: u32) -> Self {
        TestCaseReference { batch_id, offset }
    }
}

/// Current health of one test, keyed by test name.
///
/// `timestamp` is the run identifier of the most recently processed run and
/// never decreases across the lifetime of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TestStatus {
    pub test_name: String,
    pub timestamp: i64,
    pub passing_count: u32,
    pub failing_count: u32,
    pub failing_cases: Vec<TestCaseReference>,
}

impl TestStatus {
    /// Zero-value status for a test that has never been processed.
    pub fn new(test_name: impl Into<String>) -> Self {
        TestStatus {
            test_name: test_name.into(),
            timestamp: 0,
            passing_count: 0,
            failing_count: 0,
            failing_cases: Vec::new(),
        }
    }

    pub fn with_results(
        test_name: impl Into<String>,
        timestamp: i64,
        passing_count: u32,
        failing_cases: Vec<TestCaseReference>,
    ) -> Self {
        TestStatus {
            test_name: test_name.into(),
            timestamp,
            passing_count,
            failing_count: failing_cases.len() as u32,
            failing_cases,
        }
    }

    /// Whether this status is strictly newer than `current` and may replace it.
    pub fn supersedes(&self, current: &TestStatus) -> bool {
        self.timestamp > current.timestamp
    }

    pub fn failing_cases_json(&self) -> JsonValue {
        serde_json::to_value(&self.failing_cases).unwrap_or_else(|_| JsonValue::Array(Vec::new()))
    }

    pub fn failing_cases_from_json(
        value: &JsonValue,
    ) -> Result<Vec<TestCaseReference>, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}
