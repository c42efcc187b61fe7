// src/connectors/extractor.rs
use crate::config::ExtractRule;
use crate::connectors::traits::PriceExtractor;
use crate::error::{Result, WatchError};
use crate::utils::precision::{normalize_price, parse_price};
use rust_decimal::Decimal;
use scraper::{Html, Selector};

/// Finds the first element matching the rule's CSS selector and parses its
/// text (or the configured attribute) as a price.
pub struct SelectorExtractor;

impl PriceExtractor for SelectorExtractor {
    fn extract(&self, page: &str, rule: &ExtractRule) -> Result<Decimal> {
        let selector = Selector::parse(&rule.selector)
            .map_err(|e| WatchError::Extract(format!("invalid selector '{}': {e:?}", rule.selector)))?;

        let document = Html::parse_document(page);
        let element = document.select(&selector).next().ok_or_else(|| {
            WatchError::Extract(format!("no element matches '{}'", rule.selector))
        })?;

        let raw = match rule.attribute.as_deref() {
            Some(attr) => element
                .value()
                .attr(attr)
                .ok_or_else(|| {
                    WatchError::Extract(format!("'{}' has no attribute '{attr}'", rule.selector))
                })?
                .to_string(),
            None => element.text().collect::<String>(),
        };

        let price = parse_price(&raw)
            .ok_or_else(|| WatchError::Extract(format!("no price in '{}'", raw.trim())))?;

        Ok(normalize_price(price))
    }
}
