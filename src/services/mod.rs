//! Alerting services.

pub mod alert_job;
pub mod classifier;
pub mod committer;
pub mod digest;
pub mod mailer;
pub mod queue;
pub mod subscribers;
pub mod window;

pub use alert_job::{AlertPipeline, JobOutcome};
pub use mailer::{MailTransport, SmtpMailer};
pub use queue::{start_alert_worker, AlertQueue};
pub use subscribers::SubscriberDirectory;
