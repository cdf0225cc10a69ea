// 8.3 engine/liquidity.rs: add_liquidity/remove_liquidity entry points
// (§4.4.2), wrapping Market's subsidy-lock adjustments.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, LiquidityAddedEvent, LiquidityRemovedEvent};
use crate::types::MarketId;
use rust_decimal::Decimal;

impl Engine {
    pub fn add_liquidity(&mut self, market_id: MarketId, delta_b: Decimal) -> Result<(), EngineError> {
        let market = self.markets.get_mut(&market_id).ok_or(EngineError::MarketNotFound(market_id))?;
        market.add_liquidity(&mut self.risk, &mut self.ledger, delta_b)?;
        let new_b = market.b;
        self.emit_event(EventPayload::LiquidityAdded(LiquidityAddedEvent { market_id, delta_b, new_b }));
        self.check_invariants()?;
        Ok(())
    }

    pub fn remove_liquidity(&mut self, market_id: MarketId, delta_b: Decimal) -> Result<(), EngineError> {
        let market = self.markets.get_mut(&market_id).ok_or(EngineError::MarketNotFound(market_id))?;
        market.remove_liquidity(&mut self.risk, &mut self.ledger, delta_b)?;
        let new_b = market.b;
        self.emit_event(EventPayload::LiquidityRemoved(LiquidityRemovedEvent { market_id, delta_b, new_b }));
        self.check_invariants()?;
        Ok(())
    }
}
