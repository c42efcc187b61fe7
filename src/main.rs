// src/main.rs
use crate::bot::CommandListener;
use crate::config::{ConfigSource, FileConfigSource};
use crate::connectors::extractor::SelectorExtractor;
use crate::connectors::http::HttpFetcher;
use crate::connectors::notifier::{NotifierHub, RetryingNotifier};
use crate::connectors::store::JsonFileStore;
use crate::connectors::telegram::TelegramClient;
use crate::core::clock::SystemClock;
use crate::core::scheduler::{Collaborators, PriceWatcher};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod bot;
mod config;
mod connectors;
mod core;
mod error;
mod strategies;
mod telemetry;
mod types;
mod utils;

#[cfg(test)]
mod test_utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config_source = Arc::new(FileConfigSource::from_env());
    let config = config_source.load()?;

    let _log_guard = telemetry::init(config.log_dir.as_deref())?;

    info!("========================================");
    info!("        PRICE WATCHER - v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    for service in &config.services {
        info!(
            service = %service.name,
            kind = ?service.price_type,
            items = service.items.len(),
            "Service configured"
        );
    }

    // 2. Initialize Components
    let telegram = config
        .bot_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|token| Arc::new(TelegramClient::new(token)));

    let deps = Collaborators {
        config: config_source.clone(),
        fetcher: Arc::new(HttpFetcher::new(Duration::from_secs(config.request_timeout_secs))?),
        extractor: Arc::new(SelectorExtractor),
        notifier: Arc::new(RetryingNotifier::new(NotifierHub::new(telegram.clone()))),
        clock: Arc::new(SystemClock),
    };

    // 3. Shutdown signal
    let cancel = CancellationToken::new();
    tokio::spawn(watch_for_interruption(cancel.clone()));

    // 4. Run one watcher per service
    let mut tasks = Vec::new();
    for service in &config.services {
        let store = Arc::new(JsonFileStore::new(config.state_path(&service.name)));
        let watcher = PriceWatcher::new(
            service.name.clone(),
            deps.clone(),
            store,
            strategies::cadence_for(service.price_type),
            cancel.clone(),
        );
        tasks.push(tokio::spawn(watcher.run()));
    }

    if let Some(client) = telegram {
        let listener = CommandListener::new(
            client,
            deps.config.clone(),
            deps.fetcher.clone(),
            deps.extractor.clone(),
            cancel.clone(),
        );
        tasks.push(tokio::spawn(listener.run()));
    } else {
        info!("No bot_token configured, chat commands disabled");
    }

    for result in futures::future::join_all(tasks).await {
        if let Err(e) = result {
            warn!(error = %e, "Task ended abnormally");
        }
    }

    info!("Shut down the application");
    Ok(())
}

/// Cancels `cancel` on Ctrl+C or SIGTERM. Never cancels on its own.
async fn watch_for_interruption(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM, Ctrl+C only");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;

    info!("Interrupt received, stopping after the current cycle");
    cancel.cancel();
}

/// Resolves on Ctrl+C; pends forever if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
