//! Alert job pipeline.
//!
//! One invocation per completed run: fetch the run window, classify it
//! against the stored status, commit the new status, then notify.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::AlertConfig;
use crate::error::AppResult;
use crate::models::{RunKey, TestStatus};
use crate::services::classifier::{classify, Classification};
use crate::services::committer::{CommitOutcome, StatusCommitter};
use crate::services::digest::{compose_digest, status_link, Headline};
use crate::services::mailer::MailTransport;
use crate::services::subscribers::SubscriberDirectory;
use crate::services::window::{fetch_window, resolve_failures};
use crate::store::ResultStore;

/// What a single job invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The stored status already covers this run.
    AlreadyProcessed,
    /// No runs in the window; nothing committed.
    NoUpdate,
    /// A concurrent job advanced the status first.
    Stale,
    Committed {
        headline: Option<Headline>,
        notified: bool,
    },
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyProcessed => "already_processed",
            Self::NoUpdate => "no_update",
            Self::Stale => "stale",
            Self::Committed { .. } => "committed",
        }
    }
}

#[derive(Clone)]
pub struct AlertPipeline {
    store: Arc<dyn ResultStore>,
    subscribers: Arc<dyn SubscriberDirectory>,
    mailer: Arc<dyn MailTransport>,
    committer: StatusCommitter,
    config: Arc<AlertConfig>,
}

impl AlertPipeline {
    pub fn new(
        store: Arc<dyn ResultStore>,
        subscribers: Arc<dyn SubscriberDirectory>,
        mailer: Arc<dyn MailTransport>,
        config: AlertConfig,
    ) -> Self {
        let committer = StatusCommitter::from_config(store.clone(), &config);
        AlertPipeline {
            store,
            subscribers,
            mailer,
            committer,
            config: Arc::new(config),
        }
    }

    /// Process the completed run identified by `key`.
    ///
    /// Errors are returned only when the status could not be committed and
    /// the job should be redelivered. Notification failures are logged.
    #[instrument(name = "alert_job.process", skip(self, key), fields(run_key = %key))]
    pub async fn process(&self, key: &RunKey) -> AppResult<JobOutcome> {
        let status = self
            .store
            .get_status(&key.test_name)
            .await?
            .unwrap_or_else(|| TestStatus::new(&key.test_name));

        if status.timestamp >= key.run_id {
            debug!("Status already at {}, skipping", status.timestamp);
            return Ok(JobOutcome::AlreadyProcessed);
        }

        let previous_failures = resolve_failures(self.store.as_ref(), &status).await?;
        let window = fetch_window(self.store.as_ref(), key, &status, &self.config).await?;

        let Some(classification) = classify(&key.test_name, &previous_failures, &window) else {
            info!("No runs in window, nothing to update");
            return Ok(JobOutcome::NoUpdate);
        };

        match self.committer.commit(&classification.status).await? {
            CommitOutcome::Stale => return Ok(JobOutcome::Stale),
            CommitOutcome::Committed => {}
        }

        let headline = Headline::select(&classification.buckets);
        let notified = match headline {
            Some(_) => self.notify(key, &classification).await,
            None => false,
        };

        Ok(JobOutcome::Committed { headline, notified })
    }

    /// Send the digest for a committed classification. Best effort.
    async fn notify(&self, key: &RunKey, classification: &Classification) -> bool {
        let recipients = match self.subscribers.subscribers(&key.test_name).await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!("Failed to load subscribers: {}", e);
                return false;
            }
        };

        let link = status_link(
            &self.config.dashboard_url,
            &key.test_name,
            classification.status.timestamp,
        );
        let Some(digest) = compose_digest(&key.test_name, classification, &link, recipients)
        else {
            return false;
        };

        if digest.recipients.is_empty() {
            info!(
                headline = digest.headline.as_str(),
                "No subscribers, digest not sent: {}", digest.subject
            );
            return false;
        }

        let recipient_count = digest.recipients.len();
        match self.mailer.send_all(vec![digest.into()]).await {
            Ok(()) => {
                info!("Sent digest to {} recipients", recipient_count);
                true
            }
            Err(e) => {
                error!("Failed to send digest: {}", e);
                false
            }
        }
    }
}
