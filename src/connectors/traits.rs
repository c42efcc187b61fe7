use crate::config::{ExtractRule, NotifyTarget};
use crate::error::Result;
use crate::types::BaselineMap;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Raw page body. Retries, if any, are the implementation's business.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub trait PriceExtractor: Send + Sync {
    fn extract(&self, page: &str, rule: &ExtractRule) -> Result<Decimal>;
}

#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn read(&self) -> Result<BaselineMap>;

    async fn write(&self, baseline: &BaselineMap) -> Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, subject: &str, target: &NotifyTarget) -> Result<()>;
}
