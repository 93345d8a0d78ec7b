//! Domain models for test runs, test case results and test status.

pub mod test_case;
pub mod test_run;
pub mod test_status;

// Re-export commonly used types
pub use test_case::{TestCase, TestCaseBatch, TestCaseResult};
pub use test_run::{RunKey, RunType, TestRun, micros_to_datetime};
pub use test_status::{TestCaseReference, TestStatus};
