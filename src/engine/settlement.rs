// 8.4 engine/settlement.rs: resolve/void entry points (§4.4.3, §4.4.4).

use super::core::Engine;
use super::results::EngineError;
use crate::decimal::Credit;
use crate::events::{EventPayload, MarketResolvedEvent, MarketVoidedEvent};
use crate::types::{MarketId, OutcomeIndex};

impl Engine {
    pub fn resolve(&mut self, market_id: MarketId, outcome: OutcomeIndex) -> Result<(), EngineError> {
        let amm_account_id = self.get_market(market_id)?.amm_account_id;
        let amm_balance_before = self.risk.account(amm_account_id)?.balance();

        let market = self.markets.get_mut(&market_id).ok_or(EngineError::MarketNotFound(market_id))?;
        market.resolve(&mut self.risk, &mut self.ledger, outcome)?;

        let amm_realized = self
            .risk
            .account(amm_account_id)?
            .balance()
            .checked_sub(amm_balance_before)
            .unwrap_or(Credit::ZERO);
        self.emit_event(EventPayload::MarketResolved(MarketResolvedEvent { market_id, outcome, amm_realized }));
        self.check_invariants()?;
        Ok(())
    }

    pub fn void(&mut self, market_id: MarketId) -> Result<(), EngineError> {
        let locks_released: usize = self
            .risk
            .accounts()
            .map(|a| a.locks_for_market(market_id).count())
            .sum();

        let market = self.markets.get_mut(&market_id).ok_or(EngineError::MarketNotFound(market_id))?;
        market.void(&mut self.risk, &mut self.ledger)?;

        self.emit_event(EventPayload::MarketVoided(MarketVoidedEvent { market_id, locks_released }));
        self.check_invariants()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Amount, DEFAULT_MARKET_DP};
    use crate::engine::EngineConfig;
    use crate::types::Timestamp;
    use rust_decimal_macros::dec;

    #[test]
    fn void_through_the_engine_returns_every_account_to_its_starting_total() {
        let mut engine = Engine::new(EngineConfig::default());
        let trader = engine.open_account();
        engine.mint(trader, Credit::new(dec!(10000)).unwrap()).unwrap();
        let trader_total_before = engine.risk.account(trader).unwrap().total();
        let market_id = engine
            .create_market(vec!["yes".into(), "no".into()], dec!(100), DEFAULT_MARKET_DP, Timestamp::from_millis(1000))
            .unwrap();

        let delta = Amount::new(dec!(10), DEFAULT_MARKET_DP).unwrap();
        engine.buy(trader, market_id, 0, delta, Credit::new(dec!(1000)).unwrap()).unwrap();
        engine.void(market_id).unwrap();

        assert_eq!(engine.risk.account(trader).unwrap().total(), trader_total_before);
    }

    #[test]
    fn resolve_through_the_engine_pays_winner() {
        let mut engine = Engine::new(EngineConfig::default());
        let trader = engine.open_account();
        engine.mint(trader, Credit::new(dec!(10000)).unwrap()).unwrap();
        let market_id = engine
            .create_market(vec!["yes".into(), "no".into()], dec!(100), DEFAULT_MARKET_DP, Timestamp::from_millis(1000))
            .unwrap();

        let delta = Amount::new(dec!(10), DEFAULT_MARKET_DP).unwrap();
        engine.buy(trader, market_id, 0, delta, Credit::new(dec!(1000)).unwrap()).unwrap();
        engine.resolve(market_id, 0).unwrap();

        assert_eq!(engine.get_market(market_id).unwrap().resolution, Some(0));
    }
}
