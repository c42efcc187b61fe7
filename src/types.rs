// src/types.rs
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Last known price per item key. `Decimal::ZERO` means "never observed".
pub type BaselineMap = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    Marketplace,
    Bank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub key: String,
    pub price: Decimal,
    pub observed_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeVerdict {
    Unchanged,
    Changed { direction: Direction, amount: Decimal },
}

impl ChangeVerdict {
    pub fn changed(&self) -> bool {
        matches!(self, ChangeVerdict::Changed { .. })
    }

    /// Only a drop is worth telling anyone about.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            ChangeVerdict::Changed {
                direction: Direction::Down,
                ..
            }
        )
    }
}

/// What a single poll cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// Bank source outside its sending hours: nothing fetched, nothing stored.
    Skipped,
    Completed { subject: String, messages: Vec<String> },
}

impl CycleReport {
    pub fn messages(&self) -> &[String] {
        match self {
            CycleReport::Skipped => &[],
            CycleReport::Completed { messages, .. } => messages,
        }
    }
}
