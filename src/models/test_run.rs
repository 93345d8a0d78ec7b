//! Test run model: one execution of a named test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// How a test run was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Presubmit,
    Postsubmit,
    Other,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Presubmit => "presubmit",
            Self::Postsubmit => "postsubmit",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "presubmit" => Some(Self::Presubmit),
            "postsubmit" => Some(Self::Postsubmit),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies a test run: the owning test plus the run's start timestamp.
///
/// The start timestamp (microseconds since the epoch) doubles as a
/// monotonically increasing run identifier. The string form
/// `<test_name>:<run_id>` is the opaque parameter carried by alert jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct RunKey {
    pub test_name: String,
    pub run_id: i64,
}

impl RunKey {
    pub fn new(test_name: impl Into<String>, run_id: i64) -> Self {
        RunKey {
            test_name: test_name.into(),
            run_id,
        }
    }

    /// Parse the opaque `<test_name>:<run_id>` form.
    pub fn parse(s: &str) -> AppResult<Self> {
        let (test_name, run_id) = s
            .rsplit_once(':')
            .ok_or_else(|| AppError::InvalidInput(format!("Malformed run key '{}'", s)))?;
        if test_name.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Run key '{}' has no test name",
                s
            )));
        }
        let run_id = run_id
            .parse::<i64>()
            .map_err(|_| AppError::InvalidInput(format!("Run key '{}' has no valid run id", s)))?;
        if run_id <= 0 {
            return Err(AppError::InvalidInput(format!(
                "Run key '{}' has a non-positive run id",
                s
            )));
        }
        Ok(RunKey::new(test_name, run_id))
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.test_name, self.run_id)
    }
}

/// One immutable execution of a named test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TestRun {
    /// Owning test name
    pub test_name: String,
    /// Start timestamp in microseconds, also the run identifier
    pub run_id: i64,
    /// End timestamp in microseconds
    pub end_timestamp: i64,
    pub run_type: RunType,
    pub pass_count: i64,
    pub fail_count: i64,
    /// Ordered references to the test case batches of this run
    pub test_case_ids: Vec<i64>,
    /// Device build identifiers the run was executed against
    pub build_ids: Vec<String>,
}

/// Convert a microsecond epoch timestamp into a UTC datetime.
pub fn micros_to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}
