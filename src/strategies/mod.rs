pub mod bank;
pub mod marketplace;
pub mod traits;

use crate::types::PriceType;
use traits::Cadence;

pub fn cadence_for(price_type: PriceType) -> Box<dyn Cadence> {
    match price_type {
        PriceType::Marketplace => Box::new(marketplace::MarketplaceCadence::new()),
        PriceType::Bank => Box::new(bank::BankCadence::new()),
    }
}
