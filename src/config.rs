// src/config.rs

use crate::error::{Result, WatchError};
use crate::types::{PriceType, TrackedItem};
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_BANK_URL: &str = "https://investzoloto.ru/gold-sber-oms/";

#[derive(Deserialize, Clone, PartialEq)]
pub struct EmailSettings {
    pub from: String,
    pub pass: String,
    pub to: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("from", &self.from)
            .field("pass", &"***")
            .field("to", &self.to)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

/// Where the price reports of one service go.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifyTarget {
    Email(EmailSettings),
    Telegram { chat_id: i64 },
}

/// How to find the price on a fetched page.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ExtractRule {
    /// CSS selector of the element holding the price.
    pub selector: String,
    /// Read this attribute instead of the element text (e.g. `content` on a meta tag).
    #[serde(default)]
    pub attribute: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServiceConfig {
    pub name: String,
    pub price_type: PriceType,
    /// Display label used in report subjects, e.g. "wildberries".
    #[serde(default)]
    pub marketplace: String,
    #[serde(default)]
    pub items: Vec<TrackedItem>,
    #[serde(default)]
    pub sending_hours: Vec<u32>,
    #[serde(default = "default_bank_url")]
    pub bank_url: String,
    pub extract: ExtractRule,
    pub notify: NotifyTarget,
}

impl ServiceConfig {
    pub fn item_keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.key.as_str())
    }

    pub fn permits_hour(&self, hour: u32) -> bool {
        self.sending_hours.contains(&hour)
    }

    fn validate(&self, has_bot: bool) -> Result<()> {
        let invalid = |msg: String| Err(WatchError::Config(format!("service '{}': {msg}", self.name)));

        if self.name.trim().is_empty() {
            return Err(WatchError::Config("service name must not be empty".into()));
        }
        if self.extract.selector.trim().is_empty() {
            return invalid("extract.selector must not be empty".into());
        }

        match self.price_type {
            PriceType::Marketplace => {
                if self.items.is_empty() {
                    return invalid("a marketplace service needs at least one item".into());
                }
                let mut seen = HashSet::new();
                for item in &self.items {
                    if !seen.insert(item.key.as_str()) {
                        return invalid(format!("duplicate item key '{}'", item.key));
                    }
                    check_url(&item.url).or_else(|e| invalid(format!("item '{}': {e}", item.key)))?;
                }
            }
            PriceType::Bank => {
                check_url(&self.bank_url).or_else(|e| invalid(format!("bank_url: {e}")))?;
                if let Some(hour) = self.sending_hours.iter().find(|h| **h > 23) {
                    return invalid(format!("sending hour {hour} is out of range 0-23"));
                }
            }
        }

        if matches!(self.notify, NotifyTarget::Telegram { .. }) && !has_bot {
            return invalid("telegram notifications require bot_token".into());
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    pub services: Vec<ServiceConfig>,
}

impl AppConfig {
    #[cfg(test)]
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Self::build(Config::builder().add_source(File::from_str(raw, ::config::FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(WatchError::Config("no services configured".into()));
        }

        let has_bot = self.bot_token.as_deref().is_some_and(|t| !t.is_empty());
        let mut names = HashSet::new();
        for service in &self.services {
            if !names.insert(service.name.as_str()) {
                return Err(WatchError::Config(format!(
                    "duplicate service name '{}'",
                    service.name
                )));
            }
            service.validate(has_bot)?;
        }
        Ok(())
    }

    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// First bank service, used to answer `/price` in chat.
    pub fn bank_service(&self) -> Option<&ServiceConfig> {
        self.services
            .iter()
            .find(|s| s.price_type == PriceType::Bank)
    }

    pub fn state_path(&self, service: &str) -> PathBuf {
        self.state_dir.join(format!("{service}.json"))
    }
}

/// Source of the configuration, consulted at the start of every cycle.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<AppConfig>;
}

pub struct FileConfigSource {
    path: String,
}

/// `Settings.toml` (or `$APP_SETTINGS`) overlaid with `APP__*` env vars.
impl FileConfigSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("APP_SETTINGS").unwrap_or_else(|_| "Settings".to_string()))
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<AppConfig> {
        let builder = Config::builder()
            .add_source(File::with_name(&self.path))
            .add_source(Environment::with_prefix("APP").separator("__"));

        AppConfig::build(builder)
    }
}

fn check_url(raw: &str) -> std::result::Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid url '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}' in '{raw}'")),
    }
}

fn default_bank_url() -> String {
    DEFAULT_BANK_URL.to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_timeout_secs() -> u64 {
    30
}
