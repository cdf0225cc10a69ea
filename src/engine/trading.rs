// 8.2 engine/trading.rs: buy/sell entry points. thin wrappers over
// Market::buy/Market::sell (§4.4) that also emit a TradeExecuted event and
// re-run the invariant sweep.

use super::core::Engine;
use super::results::EngineError;
use crate::decimal::{Amount, Credit};
use crate::events::{EventPayload, TradeExecutedEvent};
use crate::market::Trade;
use crate::types::{AccountId, MarketId, OutcomeIndex};

impl Engine {
    pub fn buy(
        &mut self,
        account_id: AccountId,
        market_id: MarketId,
        outcome: OutcomeIndex,
        delta: Amount,
        budget_cap: Credit,
    ) -> Result<Trade, EngineError> {
        let market = self.markets.get_mut(&market_id).ok_or(EngineError::MarketNotFound(market_id))?;
        let trade = market.buy(&mut self.risk, &mut self.ledger, account_id, outcome, delta, budget_cap)?;
        self.emit_event(EventPayload::TradeExecuted(TradeExecutedEvent {
            market_id,
            trade_id: trade.id,
            outcome,
            amount: trade.amount,
            price: trade.price,
        }));
        self.check_invariants()?;
        Ok(trade)
    }

    pub fn sell(
        &mut self,
        account_id: AccountId,
        market_id: MarketId,
        outcome: OutcomeIndex,
        delta: Amount,
    ) -> Result<Trade, EngineError> {
        let market = self.markets.get_mut(&market_id).ok_or(EngineError::MarketNotFound(market_id))?;
        let trade = market.sell(&mut self.risk, &mut self.ledger, account_id, outcome, delta)?;
        self.emit_event(EventPayload::TradeExecuted(TradeExecutedEvent {
            market_id,
            trade_id: trade.id,
            outcome,
            amount: trade.amount,
            price: trade.price,
        }));
        self.check_invariants()?;
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::decimal::DEFAULT_MARKET_DP;
    use crate::types::Timestamp;
    use rust_decimal_macros::dec;

    #[test]
    fn buy_then_sell_round_trips_through_the_engine() {
        let mut engine = Engine::new(EngineConfig::default());
        let trader = engine.open_account();
        engine.mint(trader, Credit::new(dec!(10000)).unwrap()).unwrap();
        let market_id = engine
            .create_market(vec!["yes".into(), "no".into()], dec!(100), DEFAULT_MARKET_DP, Timestamp::from_millis(1000))
            .unwrap();

        let delta = Amount::new(dec!(10), DEFAULT_MARKET_DP).unwrap();
        let budget = Credit::new(dec!(1000)).unwrap();
        engine.buy(trader, market_id, 0, delta, budget).unwrap();
        engine.sell(trader, market_id, 0, delta).unwrap();

        assert!(engine.get_market(market_id).unwrap().position_of(trader, 0).is_zero());
    }
}
