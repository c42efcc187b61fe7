// src/bot/mod.rs
use crate::config::ConfigSource;
use crate::connectors::notifier::{retry, SEND_ATTEMPTS, SEND_RETRY_DELAY};
use crate::connectors::telegram::{BotCommandInfo, ChatMessage, TelegramClient};
use crate::connectors::traits::{PageFetcher, PriceExtractor};
use crate::error::{Result, WatchError};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Price,
    Help,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::Price, Command::Help];

    pub fn name(self) -> &'static str {
        match self {
            Command::Price => "price",
            Command::Help => "help",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Price => "Current gold quote",
            Command::Help => "List commands",
        }
    }

    /// `/price`, `/price@my_bot` and `/price extra words` all map to `Price`.
    pub fn parse(text: &str) -> Option<Command> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "price" => Some(Command::Price),
            "help" | "start" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Long-polls Telegram and answers chat commands until cancelled.
pub struct CommandListener {
    client: Arc<TelegramClient>,
    config: Arc<dyn ConfigSource>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn PriceExtractor>,
    cancel: CancellationToken,
    poll_timeout_secs: u64,
}

impl CommandListener {
    pub fn new(
        client: Arc<TelegramClient>,
        config: Arc<dyn ConfigSource>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn PriceExtractor>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            config,
            fetcher,
            extractor,
            cancel,
            poll_timeout_secs: POLL_TIMEOUT_SECS,
        }
    }

    #[cfg(test)]
    fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    pub async fn run(self) {
        let commands: Vec<BotCommandInfo> = Command::ALL
            .iter()
            .map(|c| BotCommandInfo {
                command: c.name().to_string(),
                description: c.description().to_string(),
            })
            .collect();
        if let Err(e) = self.client.set_my_commands(&commands).await {
            warn!(error = %e, "Cannot register bot commands");
        }

        info!("Bot listener running");
        let mut offset = 0;

        loop {
            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                polled = self.client.get_updates(offset, self.poll_timeout_secs) => polled,
            };

            let updates = match polled {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "Polling updates failed");
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => continue,
                    }
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(message) = update.message {
                    self.handle(message).await;
                }
            }
        }

        info!("Bot listener stopped");
    }

    async fn handle(&self, message: ChatMessage) {
        let Some(command) = message.text.as_deref().and_then(Command::parse) else {
            return;
        };

        let chat_id = message.chat.id;
        info!(chat_id, command = command.name(), "Command received");
        let reply = self.answer(command).await;

        let client = self.client.as_ref();
        let text = reply.as_str();
        let sent = retry(SEND_ATTEMPTS, SEND_RETRY_DELAY, "reply", move || {
            client.send_message(chat_id, text)
        })
        .await;
        if let Err(e) = sent {
            error!(chat_id, error = %e, "cannot send a message");
        }
    }

    pub async fn answer(&self, command: Command) -> String {
        match command {
            Command::Price => match self.current_quote().await {
                Ok(price) => format!("Gold rate. Sell: {price:.2} RUB"),
                Err(e) => {
                    warn!(error = %e, "Cannot answer /price");
                    "Cannot get the price right now, try again later".to_string()
                }
            },
            Command::Help => Command::ALL
                .iter()
                .map(|c| format!("/{} - {}", c.name(), c.description()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    async fn current_quote(&self) -> Result<Decimal> {
        let config = self.config.load()?;
        let bank = config
            .bank_service()
            .ok_or_else(|| WatchError::Config("no bank service configured".into()))?;

        let page = self.fetcher.fetch(&bank.bank_url).await?;
        self.extractor.extract(&page, &bank.extract)
    }
}
