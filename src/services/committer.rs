//! Status committer: monotonic compare-and-write with bounded retry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::AlertConfig;
use crate::error::{AppError, AppResult};
use crate::models::TestStatus;
use crate::store::{ResultStore, TxnOutcome};

/// Result of committing a candidate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The candidate is now the persisted status.
    Committed,
    /// A status at least as new was already persisted; nothing was written.
    Stale,
}

#[derive(Clone)]
pub struct StatusCommitter {
    store: Arc<dyn ResultStore>,
    max_attempts: u32,
    backoff: Duration,
}

impl StatusCommitter {
    pub fn new(store: Arc<dyn ResultStore>, max_attempts: u32, backoff: Duration) -> Self {
        StatusCommitter {
            store,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(store: Arc<dyn ResultStore>, config: &AlertConfig) -> Self {
        Self::new(store, config.commit_max_attempts, config.commit_backoff)
    }

    /// Persist `candidate` unless the stored status is already as new.
    ///
    /// Conflicts and outages are retried with exponential backoff. Running
    /// out of attempts yields `AppError::RetriesExhausted`.
    pub async fn commit(&self, candidate: &TestStatus) -> AppResult<CommitOutcome> {
        let decide = |current: Option<&TestStatus>| match current {
            Some(current) if !candidate.supersedes(current) => None,
            None if candidate.timestamp <= 0 => None,
            _ => Some(candidate.clone()),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.update_status(&candidate.test_name, &decide).await {
                Ok(TxnOutcome::Written) => {
                    info!(
                        "Committed status for {} at {} (attempt {})",
                        candidate.test_name, candidate.timestamp, attempt
                    );
                    return Ok(CommitOutcome::Committed);
                }
                Ok(TxnOutcome::Unchanged) => {
                    debug!(
                        "Status for {} already at or past {}",
                        candidate.test_name, candidate.timestamp
                    );
                    return Ok(CommitOutcome::Stale);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Status commit for {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        candidate.test_name, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    error!(
                        "Status commit for {} gave up after {} attempts: {}",
                        candidate.test_name, attempt, e
                    );
                    return Err(AppError::RetriesExhausted {
                        test_name: candidate.test_name.clone(),
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * (1u32 << (attempt - 1).min(6))
    }
}
