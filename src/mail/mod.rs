use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{MailConfig, MailTransport};

mod http;
mod smtp;
mod template;

pub use http::HttpMailer;
pub use smtp::SmtpMailer;
pub use template::verification_email;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail address {0:?}")]
    Address(String),
    #[error("build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound mail capability. Implementations deliver one HTML message.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl MailSender for LogMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        tracing::info!(%to, %subject, body = %html, "mail not delivered (log provider)");
        Ok(())
    }
}

pub fn from_config(cfg: &MailConfig) -> anyhow::Result<Arc<dyn MailSender>> {
    let sender: Arc<dyn MailSender> = match &cfg.transport {
        MailTransport::Smtp(smtp) => Arc::new(SmtpMailer::new(smtp, &cfg.from_name, &cfg.from_address)?),
        MailTransport::Http(http) => Arc::new(HttpMailer::new(http, &cfg.from_name, &cfg.from_address)?),
        MailTransport::Log => {
            tracing::warn!("MAIL_PROVIDER=log: verification codes are logged, not sent");
            Arc::new(LogMailer)
        }
    };
    Ok(sender)
}

#[cfg(test)]
pub(crate) mod recording {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    pub(crate) struct SentMail {
        pub to: String,
        pub subject: String,
        pub html: String,
    }

    /// Keeps every message; fails on demand.
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        sent: Mutex<Vec<SentMail>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingMailer {
        pub(crate) fn sent(&self) -> Vec<SentMail> {
            self.sent.lock().unwrap().clone()
        }

        pub(crate) fn fail_next(&self, fail: bool) {
            self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MailSender for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(MailError::Rejected {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.sent.lock().unwrap().push(SentMail {
                to: to.into(),
                subject: subject.into(),
                html: html.into(),
            });
            Ok(())
        }
    }
}
