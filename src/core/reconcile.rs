// src/core/reconcile.rs
use crate::types::BaselineMap;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Brings the stored key set in line with the configured items: keys no
/// longer tracked are dropped, new keys start at the `0` sentinel, and shared
/// keys keep their price.
pub fn reconcile<'a>(mut baseline: BaselineMap, item_keys: impl IntoIterator<Item = &'a str>) -> BaselineMap {
    let wanted: BTreeSet<&str> = item_keys.into_iter().collect();

    baseline.retain(|key, _| wanted.contains(key.as_str()));
    for key in wanted {
        baseline.entry(key.to_string()).or_insert(Decimal::ZERO);
    }

    baseline
}
