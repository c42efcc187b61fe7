// src/error.rs
use thiserror::Error;

/// Everything that can go wrong while watching a price. None of these are
/// fatal to the process: the scheduler logs them and waits for the next tick.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot get a page with the current price: {0}")]
    Fetch(String),

    #[error("cannot extract the price from the page: {0}")]
    Extract(String),

    #[error("baseline store error: {0}")]
    Persist(String),

    #[error("cannot deliver notification: {0}")]
    Notify(String),
}

impl From<config::ConfigError> for WatchError {
    fn from(err: config::ConfigError) -> Self {
        WatchError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
