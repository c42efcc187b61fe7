// src/core/analyser.rs
use crate::types::{ChangeVerdict, Direction};
use rust_decimal::Decimal;

/// Classifies `observed` against the stored `baseline`.
///
/// A zero baseline means the item has never been seen, so the first
/// observation only establishes the baseline and is never a change.
/// Comparison is exact: prices are decimals parsed from page text.
pub fn analyse(observed: Decimal, baseline: Decimal) -> ChangeVerdict {
    if baseline.is_zero() || observed == baseline {
        return ChangeVerdict::Unchanged;
    }

    let direction = if observed > baseline {
        Direction::Up
    } else {
        Direction::Down
    };

    ChangeVerdict::Changed {
        direction,
        amount: (observed - baseline).abs(),
    }
}
