//! Outgoing mail.
//!
//! `MailTransport` accepts a batch of messages for best-effort delivery.
//! `SmtpMailer` is the lettre-backed implementation.

use async_trait::async_trait;
use futures_util::future::join_all;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::{error, info};

use crate::config::SmtpConfig;
use crate::services::digest::Digest;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Failed to send message: {0}")]
    Send(String),
}

/// One message for a list of recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

impl From<Digest> for MailMessage {
    fn from(digest: Digest) -> Self {
        MailMessage {
            recipients: digest.recipients,
            subject: digest.subject,
            html_body: digest.html_body,
        }
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver every message; the first failure is returned after all were attempted.
    async fn send_all(&self, messages: Vec<MailMessage>) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    reply_to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.send_from)?;
        let reply_to = parse_mailbox(config.reply_to())?;
        let transport = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Build(e.to_string()))?
                .port(config.port)
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.expose_secret().to_string(),
                ))
                .pool_config(PoolConfig::new().max_size(5))
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        };

        Ok(SmtpMailer {
            transport,
            from,
            reply_to,
        })
    }

    fn build(&self, message: &MailMessage) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .reply_to(self.reply_to.clone())
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML);
        for recipient in &message.recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }
        builder
            .body(message.html_body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send_all(&self, messages: Vec<MailMessage>) -> Result<(), MailError> {
        let mut first_error = None;
        let mut built = Vec::with_capacity(messages.len());
        for message in &messages {
            match self.build(message) {
                Ok(m) => built.push((message.subject.clone(), m)),
                Err(e) => {
                    error!("Dropping message '{}': {}", message.subject, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        let results = join_all(built.iter().map(|(_, m)| self.transport.send(m.clone()))).await;
        for ((subject, _), result) in built.iter().zip(results) {
            match result {
                Ok(response) => info!("Sent '{}' ({})", subject, response.code()),
                Err(e) => {
                    error!("Failed to send '{}': {}", subject, e);
                    first_error.get_or_insert(MailError::Send(e.to_string()));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
