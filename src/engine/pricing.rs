// 8.5 engine/pricing.rs: read-only price queries and the engine-wide
// snapshot used for "rejected operations leave state bitwise unchanged"
// (§8 #12).

use super::core::{Engine, EngineSnapshot};
use super::results::EngineError;
use crate::decimal::Amount;
use crate::types::{MarketId, OutcomeIndex};

impl Engine {
    pub fn price(&self, market_id: MarketId, outcome: OutcomeIndex) -> Result<Amount, EngineError> {
        Ok(self.get_market(market_id)?.price(outcome)?)
    }

    pub fn prices(&self, market_id: MarketId) -> Result<Vec<Amount>, EngineError> {
        Ok(self.get_market(market_id)?.prices()?)
    }

    /// A deep, immutable copy of everything the engine owns, taken before a
    /// risky operation so the caller can assert it comes back identical on
    /// rejection.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            risk: self.risk.clone(),
            ledger: self.ledger.clone(),
            markets: self.markets.clone(),
        }
    }
}
