//! In-memory fakes for the collaborator traits, shared by the test modules.

use crate::config::{
    AppConfig, ConfigSource, EmailSettings, ExtractRule, NotifyTarget, ServiceConfig,
    DEFAULT_BANK_URL,
};
use crate::connectors::traits::{BaselineStore, Notifier, PageFetcher, PriceExtractor};
use crate::core::clock::Clock;
use crate::error::{Result, WatchError};
use crate::types::{BaselineMap, PriceType, TrackedItem};
use crate::utils::precision::parse_price;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub fn url(key: &str) -> String {
    format!("https://shop.example/{key}")
}

pub fn prices(entries: &[(&str, i64)]) -> BaselineMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Decimal::from(*v)))
        .collect()
}

pub fn email_target() -> NotifyTarget {
    NotifyTarget::Email(EmailSettings {
        from: "bot@example.com".into(),
        pass: "secret".into(),
        to: "me@example.com".into(),
        smtp_host: "smtp.example.com".into(),
        smtp_port: 465,
    })
}

pub fn marketplace(keys: &[&str]) -> ServiceConfig {
    ServiceConfig {
        name: "wb".into(),
        price_type: PriceType::Marketplace,
        marketplace: "wildberries".into(),
        items: keys
            .iter()
            .map(|k| TrackedItem {
                key: k.to_string(),
                url: url(k),
            })
            .collect(),
        sending_hours: Vec::new(),
        bank_url: DEFAULT_BANK_URL.into(),
        extract: ExtractRule {
            selector: ".price".into(),
            attribute: None,
        },
        notify: email_target(),
    }
}

pub fn bank(hours: &[u32]) -> ServiceConfig {
    ServiceConfig {
        name: "gold".into(),
        price_type: PriceType::Bank,
        marketplace: String::new(),
        items: Vec::new(),
        sending_hours: hours.to_vec(),
        bank_url: DEFAULT_BANK_URL.into(),
        extract: ExtractRule {
            selector: ".sell".into(),
            attribute: None,
        },
        notify: NotifyTarget::Telegram { chat_id: 42 },
    }
}

pub fn app_config(services: Vec<ServiceConfig>) -> AppConfig {
    AppConfig {
        bot_token: None,
        state_dir: PathBuf::from("state"),
        log_dir: None,
        request_timeout_secs: 30,
        services,
    }
}

/// Serves canned pages per URL and records every request. Unknown URLs fail.
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, Option<String>>>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn set_page(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Some(body.to_string()));
    }

    pub fn set_price(&self, url: &str, price: &str) {
        self.set_page(url, price);
    }

    pub fn fail(&self, url: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), None);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.lock().unwrap().get(url) {
            Some(Some(body)) => Ok(body.clone()),
            _ => Err(WatchError::Fetch(format!("{url}: connection refused"))),
        }
    }
}

/// Treats the whole page as price text.
pub struct PlainExtractor;

impl PriceExtractor for PlainExtractor {
    fn extract(&self, page: &str, _rule: &ExtractRule) -> Result<Decimal> {
        parse_price(page).ok_or_else(|| WatchError::Extract(format!("no price in '{page}'")))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    prices: Mutex<BaselineMap>,
    reads: AtomicU32,
    writes: AtomicU32,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn with(entries: &[(&str, i64)]) -> Self {
        let store = Self::default();
        store.set(entries);
        store
    }

    pub fn set(&self, entries: &[(&str, i64)]) {
        *self.prices.lock().unwrap() = prices(entries);
    }

    pub fn snapshot(&self) -> BaselineMap {
        self.prices.lock().unwrap().clone()
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BaselineStore for MemoryStore {
    async fn read(&self) -> Result<BaselineMap> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(WatchError::Persist("disk on fire".into()));
        }
        Ok(self.snapshot())
    }

    async fn write(&self, baseline: &BaselineMap) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WatchError::Persist("read-only filesystem".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.prices.lock().unwrap() = baseline.clone();
        Ok(())
    }
}

#[derive(Default)]
struct NotifierState {
    attempts: u32,
    fail_first: u32,
    sent: Vec<(String, String)>,
}

/// Records delivered `(body, subject)` pairs; can fail the first N attempts.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    state: Arc<Mutex<NotifierState>>,
}

impl FakeNotifier {
    pub fn failing_first(n: u32) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().fail_first = n;
        fake
    }

    pub fn fail_always(&self) {
        self.state.lock().unwrap().fail_first = u32::MAX;
    }

    pub fn attempts(&self) -> u32 {
        self.state.lock().unwrap().attempts
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, message: &str, subject: &str, _target: &NotifyTarget) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.attempts += 1;
        if state.attempts <= state.fail_first {
            return Err(WatchError::Notify("smtp 421 try again later".into()));
        }
        state.sent.push((message.to_string(), subject.to_string()));
        Ok(())
    }
}

pub struct FakeConfigSource {
    config: AppConfig,
    broken: AtomicBool,
}

impl FakeConfigSource {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            broken: AtomicBool::new(false),
        }
    }

    pub fn fail(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.broken.store(false, Ordering::SeqCst);
    }
}

impl ConfigSource for FakeConfigSource {
    fn load(&self) -> Result<AppConfig> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(WatchError::Config("Settings.toml: unexpected EOF".into()));
        }
        Ok(self.config.clone())
    }
}

pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    pub fn at_hour(hour: u32) -> Self {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        Self(tz.with_ymd_and_hms(2024, 5, 1, hour, 17, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
