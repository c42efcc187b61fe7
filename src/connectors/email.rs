// src/connectors/email.rs
use crate::config::EmailSettings;
use crate::error::{Result, WatchError};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// SMTP delivery over implicit TLS. Transports are built per message since
/// each service carries its own credentials.
pub struct EmailSender;

impl EmailSender {
    pub async fn send(&self, settings: &EmailSettings, subject: &str, body: &str) -> Result<()> {
        let email = build_message(settings, subject, body)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|e| WatchError::Notify(format!("smtp relay {}: {e}", settings.smtp_host)))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(settings.from.clone(), settings.pass.clone()))
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| WatchError::Notify(format!("smtp send to {}: {e}", settings.to)))?;

        info!(to = %settings.to, subject, "Email sent");
        Ok(())
    }
}

fn build_message(settings: &EmailSettings, subject: &str, body: &str) -> Result<Message> {
    let from = settings
        .from
        .parse::<Mailbox>()
        .map_err(|e| WatchError::Notify(format!("bad sender address '{}': {e}", settings.from)))?;
    let to = settings
        .to
        .parse::<Mailbox>()
        .map_err(|e| WatchError::Notify(format!("bad recipient address '{}': {e}", settings.to)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| WatchError::Notify(format!("cannot build email: {e}")))
}
