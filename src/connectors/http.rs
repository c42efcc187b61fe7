// src/connectors/http.rs
use crate::connectors::traits::PageFetcher;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Browser User-Agents, one picked per request so the polling does not look like one bot.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

pub struct HttpFetcher {
    http_client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| WatchError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http_client })
    }
}

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .http_client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .header(ACCEPT_LANGUAGE, "ru-RU,ru;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| WatchError::Fetch(format!("request to {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| WatchError::Fetch(format!("{url}: {e}")))?;

        let body = response
            .text()
            .await
            .map_err(|e| WatchError::Fetch(format!("reading body of {url} failed: {e}")))?;

        debug!(url, bytes = body.len(), "page fetched");
        Ok(body)
    }
}
