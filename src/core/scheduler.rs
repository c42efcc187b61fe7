// src/core/scheduler.rs
use crate::config::ConfigSource;
use crate::connectors::traits::{BaselineStore, Notifier, PageFetcher, PriceExtractor};
use crate::core::clock::Clock;
use crate::core::cycle::PollCycle;
use crate::error::{Result, WatchError};
use crate::strategies::traits::Cadence;
use crate::types::CycleReport;
use std::sync::Arc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Collaborators shared by every watcher task.
#[derive(Clone)]
pub struct Collaborators {
    pub config: Arc<dyn ConfigSource>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub extractor: Arc<dyn PriceExtractor>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Scheduler loop of one service.
///
/// Runs a cycle right away, then sleeps until the cadence's next deadline,
/// runs another cycle, and so on until cancelled. Cycles never overlap and
/// are never interrupted; cancellation is only noticed while waiting.
pub struct PriceWatcher {
    service: String,
    deps: Collaborators,
    store: Arc<dyn BaselineStore>,
    cadence: Box<dyn Cadence>,
    cancel: CancellationToken,
}

impl PriceWatcher {
    pub fn new(
        service: impl Into<String>,
        deps: Collaborators,
        store: Arc<dyn BaselineStore>,
        cadence: Box<dyn Cadence>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            service: service.into(),
            deps,
            store,
            cadence,
            cancel,
        }
    }

    pub async fn run(mut self) {
        info!(service = %self.service, cadence = self.cadence.name(), "Watcher starting...");

        self.tick().await;

        let first_wait = self.cadence.first_wait(self.deps.clock.now());
        info!(service = %self.service, wait_secs = first_wait.as_secs(), "Timer armed");
        let mut deadline = Instant::now() + first_wait;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(service = %self.service, "Shut down the watcher");
                    return;
                }
                _ = sleep_until(deadline) => {}
            }

            let fired_at = deadline;
            self.tick().await;

            deadline = self.cadence.next_tick(fired_at, Instant::now());
            info!(
                service = %self.service,
                wait_secs = deadline.saturating_duration_since(Instant::now()).as_secs(),
                "Timer re-armed"
            );
        }
    }

    /// One cycle with its errors logged and swallowed.
    async fn tick(&mut self) {
        if let Err(e) = self.serve().await {
            error!(service = %self.service, error = %e, "An error occurs while serving a price");
        }
    }

    async fn serve(&mut self) -> Result<()> {
        let config = self.deps.config.load()?;
        let service = config
            .service(&self.service)
            .ok_or_else(|| WatchError::Config(format!("service '{}' is no longer configured", self.service)))?
            .clone();

        let cycle = PollCycle {
            fetcher: self.deps.fetcher.as_ref(),
            extractor: self.deps.extractor.as_ref(),
            store: self.store.as_ref(),
            clock: self.deps.clock.as_ref(),
        };
        let report = cycle.run(&service, self.cadence.as_mut()).await?;
        debug!(service = %service.name, messages = report.messages().len(), "Cycle finished");

        match report {
            CycleReport::Skipped => {}
            CycleReport::Completed { messages, .. } if messages.is_empty() => {
                info!(service = %service.name, "Nothing to report");
            }
            CycleReport::Completed { subject, messages } => {
                let body = messages.join("\n");
                if let Err(e) = self.deps.notifier.send(&body, &subject, &service.notify).await {
                    // Prices are already stored; the report is lost, not retried next cycle.
                    warn!(service = %service.name, "Report not delivered");
                    return Err(e);
                }
                info!(service = %service.name, count = messages.len(), "Report sent");
            }
        }

        Ok(())
    }
}
