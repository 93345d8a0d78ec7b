//! Shared fixtures for alerting tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use testwatch_lib::config::AlertConfig;
use testwatch_lib::models::{RunType, TestCase, TestCaseBatch, TestCaseResult, TestRun};
use testwatch_lib::services::mailer::{MailError, MailMessage, MailTransport};
use testwatch_lib::services::AlertPipeline;
use testwatch_lib::store::memory::MemoryStore;

pub const TEST_NAME: &str = "VtsKernelTest";
pub const HOUR: i64 = 3_600_000_000;

/// Base run identifier, 2017-06-15T12:00:00Z in microseconds.
pub const T0: i64 = 1_497_528_000_000_000;

/// Mail transport that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        RecordingMailer {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send_all(&self, messages: Vec<MailMessage>) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Send("relay refused connection".to_string()));
        }
        self.sent.lock().unwrap().extend(messages);
        Ok(())
    }
}

pub fn fast_config() -> AlertConfig {
    AlertConfig {
        dashboard_url: "https://dash.example.com".to_string(),
        commit_max_attempts: 3,
        commit_backoff: Duration::from_millis(1),
        ..AlertConfig::default()
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub pipeline: AlertPipeline,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let pipeline = AlertPipeline::new(
            store.clone(),
            store.clone(),
            mailer.clone(),
            fast_config(),
        );
        store.subscribe(TEST_NAME, "owner@example.com");
        Harness {
            store,
            mailer,
            pipeline,
        }
    }

    /// Insert a postsubmit run with a single batch whose id equals the run id.
    pub fn seed_run(&self, run_id: i64, cases: &[(&str, TestCaseResult)]) {
        self.seed_run_with_build(run_id, cases, "4455");
    }

    pub fn seed_run_with_build(&self, run_id: i64, cases: &[(&str, TestCaseResult)], build: &str) {
        self.store.insert_batch(&TestCaseBatch::new(
            run_id,
            cases
                .iter()
                .map(|(name, result)| TestCase::new(*name, *result))
                .collect(),
        ));
        self.store.insert_run(TestRun {
            test_name: TEST_NAME.to_string(),
            run_id,
            end_timestamp: run_id + 60_000_000,
            run_type: RunType::Postsubmit,
            pass_count: cases.iter().filter(|(_, r)| r.is_pass()).count() as i64,
            fail_count: cases.iter().filter(|(_, r)| r.is_failure()).count() as i64,
            test_case_ids: vec![run_id],
            build_ids: vec![build.to_string()],
        });
    }
}
