// src/connectors/telegram.rs
use crate::error::{Result, WatchError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Минимальный клиент Telegram Bot API: long polling и отправка сообщений.
pub struct TelegramClient {
    http_client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotCommandInfo {
    pub command: String,
    pub description: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(format!("https://api.telegram.org/bot{token}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        let resp: ApiResponse<T> = self
            .http_client
            .post(&url)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| WatchError::Notify(format!("telegram {method}: {e}")))?
            .json()
            .await
            .map_err(|e| WatchError::Notify(format!("telegram {method}: bad response: {e}")))?;

        if !resp.ok {
            let reason = resp.description.unwrap_or_else(|| "unknown error".into());
            return Err(WatchError::Notify(format!("telegram {method}: {reason}")));
        }

        resp.result
            .ok_or_else(|| WatchError::Notify(format!("telegram {method}: empty result")))
    }

    /// Long-polls for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        let updates: Vec<Update> = self
            .call("getUpdates", body, Duration::from_secs(timeout_secs + 10))
            .await?;
        debug!(count = updates.len(), "telegram updates received");
        Ok(updates)
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "text": text });
        let _: serde_json::Value = self
            .call("sendMessage", body, Duration::from_secs(30))
            .await?;
        Ok(())
    }

    pub async fn set_my_commands(&self, commands: &[BotCommandInfo]) -> Result<()> {
        let body = json!({ "commands": commands });
        let _: bool = self
            .call("setMyCommands", body, Duration::from_secs(30))
            .await?;
        Ok(())
    }
}
