use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{MailError, MailSender};
use crate::config::SmtpConfig;

/// Delivers through an SMTP relay, upgrading to TLS when the server offers STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig, from_name: &str, from_address: &str) -> Result<Self, MailError> {
        let tls = TlsParameters::new(cfg.host.clone())?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
            .port(cfg.port)
            .credentials(Credentials::new(cfg.user.clone(), cfg.password.clone()))
            .tls(Tls::Opportunistic(tls))
            .build();
        Ok(Self {
            transport,
            from: sender_mailbox(from_name, from_address)?,
        })
    }
}

pub(super) fn sender_mailbox(name: &str, address: &str) -> Result<Mailbox, MailError> {
    let address: Address = address
        .parse()
        .map_err(|_| MailError::Address(address.to_string()))?;
    Ok(Mailbox::new(Some(name.to_string()), address))
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let to: Mailbox = to.parse().map_err(|_| MailError::Address(to.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())?;
        let response = self.transport.send(message).await?;
        tracing::debug!(code = %response.code(), "smtp relay accepted message");
        Ok(())
    }
}
