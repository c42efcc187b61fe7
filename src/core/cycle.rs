// src/core/cycle.rs
use crate::config::{ExtractRule, ServiceConfig};
use crate::connectors::traits::{BaselineStore, PageFetcher, PriceExtractor};
use crate::core::analyser::analyse;
use crate::core::clock::Clock;
use crate::core::reconcile::reconcile;
use crate::error::Result;
use crate::strategies::traits::Cadence;
use crate::types::{ChangeVerdict, CycleReport, Observation, PriceType, TrackedItem};
use chrono::Timelike;
use rust_decimal::Decimal;
use tracing::{debug, info};

pub const BANK_SUBJECT: &str = "Gold quote";

/// One pass over a service: fetch, extract, compare, store.
///
/// Items are checked one after another with the cadence's gap in between.
/// The first fetch or extraction failure aborts the pass before anything is
/// written, so a failed cycle leaves the stored prices exactly as they were.
pub struct PollCycle<'a> {
    pub fetcher: &'a dyn PageFetcher,
    pub extractor: &'a dyn PriceExtractor,
    pub store: &'a dyn BaselineStore,
    pub clock: &'a dyn Clock,
}

impl PollCycle<'_> {
    pub async fn run(&self, service: &ServiceConfig, cadence: &mut dyn Cadence) -> Result<CycleReport> {
        match service.price_type {
            PriceType::Bank => self.run_bank(service).await,
            PriceType::Marketplace => self.run_marketplace(service, cadence).await,
        }
    }

    async fn observe(&self, key: &str, url: &str, rule: &ExtractRule) -> Result<Observation> {
        let page = self.fetcher.fetch(url).await?;
        let price = self.extractor.extract(&page, rule)?;
        Ok(Observation {
            key: key.to_string(),
            price,
            observed_at: self.clock.now(),
        })
    }

    async fn run_bank(&self, service: &ServiceConfig) -> Result<CycleReport> {
        let hour = self.clock.now().hour();
        info!(service = %service.name, hour, "Check time for processing a price");

        if !service.permits_hour(hour) {
            info!(service = %service.name, hour, "Not a sending hour, skipping");
            return Ok(CycleReport::Skipped);
        }

        let quote = self.observe("bank", &service.bank_url, &service.extract).await?;
        info!(service = %service.name, price = %quote.price, "Bank quote received");

        Ok(CycleReport::Completed {
            subject: BANK_SUBJECT.to_string(),
            messages: vec![format!("Gold rate. Sell: {:.2} RUB", quote.price)],
        })
    }

    async fn run_marketplace(
        &self,
        service: &ServiceConfig,
        cadence: &mut dyn Cadence,
    ) -> Result<CycleReport> {
        let stored = self.store.read().await?;
        let mut prices = reconcile(stored, service.item_keys());
        let mut messages = Vec::new();

        for (idx, item) in service.items.iter().enumerate() {
            if idx > 0 {
                let gap = cadence.item_gap();
                debug!(service = %service.name, gap_secs = gap.as_secs(), "Pausing before next item");
                tokio::time::sleep(gap).await;
            }

            let observed = self.observe(&item.key, &item.url, &service.extract).await?;
            let baseline = prices.get(&item.key).copied().unwrap_or(Decimal::ZERO);
            let verdict = analyse(observed.price, baseline);
            debug!(
                key = %item.key,
                %baseline,
                price = %observed.price,
                changed = verdict.changed(),
                at = %observed.observed_at,
                "Price analysed"
            );

            match verdict {
                ChangeVerdict::Changed { amount, .. } if verdict.is_reportable() => {
                    info!(key = %item.key, from = %baseline, to = %observed.price, "The item price has dropped");
                    messages.push(drop_message(item, amount, observed.price));
                }
                ChangeVerdict::Changed { amount, .. } => {
                    info!(key = %item.key, from = %baseline, to = %observed.price, %amount, "The item price went up");
                }
                ChangeVerdict::Unchanged if baseline.is_zero() => {
                    info!(key = %item.key, price = %observed.price, "First price recorded");
                }
                ChangeVerdict::Unchanged => {
                    debug!(key = %item.key, price = %observed.price, "The item price has not changed");
                }
            }

            prices.insert(observed.key, observed.price);
        }

        self.store.write(&prices).await?;

        Ok(CycleReport::Completed {
            subject: marketplace_subject(service),
            messages,
        })
    }
}

fn drop_message(item: &TrackedItem, amount: Decimal, price: Decimal) -> String {
    format!(
        "Price of {} {} dropped by {:.2} RUB. Current price: {:.2} RUB",
        item.key, item.url, amount, price
    )
}

fn marketplace_subject(service: &ServiceConfig) -> String {
    let label = if service.marketplace.is_empty() {
        &service.name
    } else {
        &service.marketplace
    };
    format!("Item price at {}", capitalize(label))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use crate::strategies::marketplace::{MarketplaceCadence, MAX_ITEM_GAP, MIN_ITEM_GAP};
    use crate::test_utils::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;
    use tokio::time::Instant;

    fn cadence() -> MarketplaceCadence<StdRng> {
        MarketplaceCadence::with_rng(StdRng::seed_from_u64(42))
    }

    struct Harness {
        fetcher: FakeFetcher,
        store: MemoryStore,
        clock: FixedClock,
    }

    impl Harness {
        fn new(stored: &[(&str, i64)]) -> Self {
            Self {
                fetcher: FakeFetcher::default(),
                store: MemoryStore::with(stored),
                clock: FixedClock::at_hour(10),
            }
        }

        async fn run(&self, service: &ServiceConfig) -> Result<CycleReport> {
            let cycle = PollCycle {
                fetcher: &self.fetcher,
                extractor: &PlainExtractor,
                store: &self.store,
                clock: &self.clock,
            };
            cycle.run(service, &mut cadence()).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn new_item_is_recorded_silently() {
        let h = Harness::new(&[("X", 100)]);
        h.fetcher.set_price(&url("X"), "100");
        h.fetcher.set_price(&url("Y"), "55");

        let report = h.run(&marketplace(&["X", "Y"])).await.unwrap();

        assert!(report.messages().is_empty());
        assert_eq!(h.store.snapshot(), prices(&[("X", 100), ("Y", 55)]));
    }

    #[tokio::test(start_paused = true)]
    async fn drop_is_reported_and_stored() {
        let h = Harness::new(&[("X", 100)]);
        h.fetcher.set_price(&url("X"), "90");

        let report = h.run(&marketplace(&["X"])).await.unwrap();

        let CycleReport::Completed { subject, messages } = report else {
            panic!("marketplace cycle never skips");
        };
        assert_eq!(subject, "Item price at Wildberries");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("dropped by 10.00"), "{}", messages[0]);
        assert!(messages[0].contains("Current price: 90.00"), "{}", messages[0]);
        assert_eq!(h.store.snapshot(), prices(&[("X", 90)]));
    }

    #[tokio::test(start_paused = true)]
    async fn rise_is_stored_without_report() {
        let h = Harness::new(&[("X", 100)]);
        h.fetcher.set_price(&url("X"), "110");

        let report = h.run(&marketplace(&["X"])).await.unwrap();

        assert!(report.messages().is_empty());
        assert_eq!(h.store.snapshot(), prices(&[("X", 110)]));
    }

    #[tokio::test(start_paused = true)]
    async fn untracked_items_are_dropped_from_store() {
        let h = Harness::new(&[("X", 100), ("gone", 7)]);
        h.fetcher.set_price(&url("X"), "100");

        h.run(&marketplace(&["X"])).await.unwrap();

        assert_eq!(h.store.snapshot(), prices(&[("X", 100)]));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_aborts_whole_cycle() {
        let h = Harness::new(&[("A", 100), ("B", 100), ("C", 100)]);
        h.fetcher.set_price(&url("A"), "50");
        h.fetcher.fail(&url("B"));
        h.fetcher.set_price(&url("C"), "50");

        let err = h.run(&marketplace(&["A", "B", "C"])).await.unwrap_err();

        assert!(matches!(err, WatchError::Fetch(_)));
        assert_eq!(h.store.snapshot(), prices(&[("A", 100), ("B", 100), ("C", 100)]));
        assert_eq!(h.store.writes(), 0);
        assert_eq!(h.fetcher.requests(), vec![url("A"), url("B")]);
    }

    #[tokio::test(start_paused = true)]
    async fn unparseable_page_aborts_cycle() {
        let h = Harness::new(&[("A", 100)]);
        h.fetcher.set_page(&url("A"), "sold out");

        let err = h.run(&marketplace(&["A"])).await.unwrap_err();

        assert!(matches!(err, WatchError::Extract(_)));
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_store_aborts_before_fetch() {
        let h = Harness::new(&[]);
        h.store.fail_reads();

        let err = h.run(&marketplace(&["A"])).await.unwrap_err();

        assert!(matches!(err, WatchError::Persist(_)));
        assert!(h.fetcher.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_discards_report() {
        let h = Harness::new(&[("A", 100)]);
        h.fetcher.set_price(&url("A"), "80");
        h.store.fail_writes();

        let err = h.run(&marketplace(&["A"])).await.unwrap_err();

        assert!(matches!(err, WatchError::Persist(_)));
        assert_eq!(h.store.snapshot(), prices(&[("A", 100)]));
    }

    #[tokio::test(start_paused = true)]
    async fn single_item_has_no_pause() {
        let h = Harness::new(&[]);
        h.fetcher.set_price(&url("A"), "10");

        let started = Instant::now();
        h.run(&marketplace(&["A"])).await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_only_between_items() {
        for n in 2..=5usize {
            let keys: Vec<String> = (0..n).map(|i| format!("item{i}")).collect();
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            let h = Harness::new(&[]);
            for key in &keys {
                h.fetcher.set_price(&url(key), "10");
            }

            let started = Instant::now();
            h.run(&marketplace(&keys)).await.unwrap();
            let elapsed = started.elapsed();

            let gaps = (n - 1) as u32;
            assert!(elapsed >= MIN_ITEM_GAP * gaps, "{n} items: {elapsed:?}");
            assert!(elapsed < MAX_ITEM_GAP * gaps, "{n} items: {elapsed:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bank_outside_sending_hours_does_nothing() {
        let h = Harness::new(&[("keep", 1)]);
        let service = bank(&[9, 13]);

        let report = h.run(&service).await.unwrap();

        assert_eq!(report, CycleReport::Skipped);
        assert!(h.fetcher.requests().is_empty());
        assert_eq!(h.store.reads(), 0);
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn bank_reports_quote_every_permitted_cycle() {
        let h = Harness::new(&[]);
        let service = bank(&[10]);
        h.fetcher.set_price(&service.bank_url, "7012.4");

        let report = h.run(&service).await.unwrap();

        assert_eq!(
            report,
            CycleReport::Completed {
                subject: BANK_SUBJECT.to_string(),
                messages: vec!["Gold rate. Sell: 7012.40 RUB".to_string()],
            }
        );
        assert_eq!(h.store.reads(), 0);
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn bank_fetch_failure_propagates() {
        let h = Harness::new(&[]);
        let service = bank(&[10]);
        h.fetcher.fail(&service.bank_url);

        let err = h.run(&service).await.unwrap_err();
        assert!(matches!(err, WatchError::Fetch(_)));
    }

    #[test]
    fn subject_falls_back_to_service_name() {
        let mut service = marketplace(&["A"]);
        service.marketplace.clear();
        assert_eq!(marketplace_subject(&service), "Item price at Wb");
    }
}
