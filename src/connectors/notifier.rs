// src/connectors/notifier.rs
use crate::config::NotifyTarget;
use crate::connectors::email::EmailSender;
use crate::connectors::telegram::TelegramClient;
use crate::connectors::traits::Notifier;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const SEND_ATTEMPTS: u32 = 10;
pub const SEND_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Runs `op` until it succeeds or `attempts` are used up, sleeping `delay`
/// between failures. Returns the last error when every attempt failed.
pub async fn retry<T, F, Fut>(attempts: u32, delay: Duration, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!(attempt, attempts, error = %e, "{what} failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Routes a report to e-mail or Telegram depending on the service target.
pub struct NotifierHub {
    email: EmailSender,
    telegram: Option<Arc<TelegramClient>>,
}

impl NotifierHub {
    pub fn new(telegram: Option<Arc<TelegramClient>>) -> Self {
        Self {
            email: EmailSender,
            telegram,
        }
    }
}

#[async_trait]
impl Notifier for NotifierHub {
    async fn send(&self, message: &str, subject: &str, target: &NotifyTarget) -> Result<()> {
        match target {
            NotifyTarget::Email(settings) => self.email.send(settings, subject, message).await,
            NotifyTarget::Telegram { chat_id } => {
                let client = self.telegram.as_ref().ok_or_else(|| {
                    WatchError::Notify("telegram target configured without bot_token".into())
                })?;
                client
                    .send_message(*chat_id, &format!("{subject}\n\n{message}"))
                    .await
            }
        }
    }
}

/// Wraps a notifier with [`retry`].
pub struct RetryingNotifier<N> {
    inner: N,
    attempts: u32,
    delay: Duration,
}

impl<N: Notifier> RetryingNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self::with_policy(inner, SEND_ATTEMPTS, SEND_RETRY_DELAY)
    }

    pub fn with_policy(inner: N, attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            attempts,
            delay,
        }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for RetryingNotifier<N> {
    async fn send(&self, message: &str, subject: &str, target: &NotifyTarget) -> Result<()> {
        retry(self.attempts, self.delay, "notification", move || {
            self.inner.send(message, subject, target)
        })
        .await
    }
}
