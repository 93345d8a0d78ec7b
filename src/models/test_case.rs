//! Test case results, grouped into batches attached to a test run.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Outcome of a single test case execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TestCaseResult {
    Pass,
    Fail,
    Skip,
    Exception,
    Timeout,
    /// Any result string this version does not know; counts as a failure
    #[serde(other)]
    Unknown,
}

impl TestCaseResult {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Exception => "exception",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    /// Anything that is neither a pass nor a skip counts as a breakage.
    pub fn is_failure(&self) -> bool {
        !self.is_pass() && !self.is_skip()
    }
}

impl std::fmt::Display for TestCaseResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One named test case and its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TestCase {
    pub name: String,
    pub result: TestCaseResult,
}

impl TestCase {
    pub fn new(name: impl Into<String>, result: TestCaseResult) -> Self {
        TestCase {
            name: name.into(),
            result,
        }
    }
}

/// Immutable batch of test case results referenced by a test run.
///
/// Failing references in a test status point into a batch by `(id, offset)`
/// instead of duplicating the case name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseBatch {
    pub id: i64,
    pub test_cases: Vec<TestCase>,
}

impl TestCaseBatch {
    pub fn new(id: i64, test_cases: Vec<TestCase>) -> Self {
        TestCaseBatch { id, test_cases }
    }

    /// Decode the stored JSONB payload (`[{name, result}]`).
    pub fn from_json(id: i64, value: &JsonValue) -> Result<Self, serde_json::Error> {
        let test_cases = serde_json::from_value(value.clone())?;
        Ok(TestCaseBatch { id, test_cases })
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(&self.test_cases).unwrap_or_else(|_| JsonValue::Array(Vec::new()))
    }

    /// Look up the case at `offset`, if the batch is long enough.
    pub fn get(&self, offset: u32) -> Option<&TestCase> {
        self.test_cases.get(offset as usize)
    }
}
