//! The invariant checker (§4.5): re-validates cross-domain invariants that
//! no single module's API can enforce on its own, because they compare
//! state across the risk engine, the ledger, and every market. Run after
//! every public mutating operation when `EngineConfig::check_invariants`
//! is set. A few of §8's invariants are historical (bounded AMM loss after
//! resolve, the buy/sell round-trip, the void round-trip) and are exercised
//! instead by `tests/solvency_tests.rs` and `tests/stress_tests.rs`, which
//! can compare against a pre-operation snapshot; this checker only holds
//! what is derivable from a single point-in-time state.

use crate::ledger::{Ledger, TxReason};
use crate::market::{Market, MarketStatus};
use crate::risk::{LockType, RiskEngine};
use crate::types::{AccountId, MarketId, OutcomeIndex};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("global credit total {total} does not equal minted {minted} minus burned {burned}")]
    CreditConservation {
        total: Decimal,
        minted: Decimal,
        burned: Decimal,
    },
    #[error("account {0} frozen balance does not equal the sum of its own locks")]
    FrozenMismatch(AccountId),
    #[error("market {0} prices sum to {1}, not 1")]
    PricesDontSumToOne(MarketId, Decimal),
    #[error("market {0} outcome {1}: q is {2} but positions sum to {3}")]
    QDoesNotMatchPositions(MarketId, OutcomeIndex, Decimal, Decimal),
    #[error("account {0} in market {1} holds both a conditional_profit and a conditional_loss lock")]
    BothConditionalLocksPresent(AccountId, MarketId),
    #[error("account {0} in market {1} outcome {2} holds a position lock with a zero position")]
    PositionLockWithZeroPosition(AccountId, MarketId, OutcomeIndex),
}

/// Re-validates every invariant that is checkable from current state alone.
/// Stateless; `Engine` owns one and calls it after every mutating public
/// operation when `EngineConfig::check_invariants` is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvariantChecker;

impl InvariantChecker {
    /// Returns the first violation found; does not attempt to collect all
    /// of them, matching §4.5's "produce an `InvariantViolation` immediately
    /// on first failure."
    pub fn check_all(
        &self,
        risk: &RiskEngine,
        ledger: &Ledger,
        markets: &std::collections::HashMap<MarketId, Market>,
    ) -> Result<(), InvariantViolation> {
        check_credit_conservation(risk, ledger)?;
        check_frozen_matches_locks(risk)?;
        for market in markets.values() {
            if market.status == MarketStatus::Open {
                check_prices_sum_to_one(market)?;
            }
            check_q_matches_positions(market)?;
            check_position_lock_zero_iff_position_zero(market, risk)?;
        }
        check_at_most_one_conditional_lock(risk, markets)?;
        Ok(())
    }
}

fn check_credit_conservation(risk: &RiskEngine, ledger: &Ledger) -> Result<(), InvariantViolation> {
    let mut minted = Decimal::ZERO;
    let mut burned = Decimal::ZERO;
    for tx in ledger.transactions() {
        match tx.reason {
            TxReason::Mint => minted += tx.amount.value(),
            TxReason::Burn => burned += -tx.amount.value(),
            _ => {}
        }
    }
    let total: Decimal = risk.accounts().map(|a| a.total().value()).sum();
    if total != minted - burned {
        return Err(InvariantViolation::CreditConservation { total, minted, burned });
    }
    Ok(())
}

fn check_frozen_matches_locks(risk: &RiskEngine) -> Result<(), InvariantViolation> {
    for account in risk.accounts() {
        let from_locks: Decimal = account.locks().map(|l| l.amount.value()).sum();
        if from_locks != account.frozen().value() {
            return Err(InvariantViolation::FrozenMismatch(account.id));
        }
    }
    Ok(())
}

fn check_prices_sum_to_one(market: &Market) -> Result<(), InvariantViolation> {
    let prices = market
        .prices()
        .expect("an open market's prices are always computable");
    let sum: Decimal = prices.iter().map(|p| p.value()).sum();
    if sum != Decimal::ONE {
        return Err(InvariantViolation::PricesDontSumToOne(market.id, sum));
    }
    Ok(())
}

fn check_q_matches_positions(market: &Market) -> Result<(), InvariantViolation> {
    for (outcome, q) in market.q.iter().enumerate() {
        let from_positions: Decimal = market
            .positions
            .values()
            .filter_map(|outs| outs.get(&outcome))
            .map(|a| a.value())
            .sum();
        if q.value() != from_positions {
            return Err(InvariantViolation::QDoesNotMatchPositions(
                market.id,
                outcome,
                q.value(),
                from_positions,
            ));
        }
    }
    Ok(())
}

fn check_position_lock_zero_iff_position_zero(
    market: &Market,
    risk: &RiskEngine,
) -> Result<(), InvariantViolation> {
    for account in risk.accounts() {
        for lock in account.locks_for_market(market.id) {
            if let LockType::Position(outcome) = lock.lock_type {
                let held = market.position_of(account.id, outcome);
                if held.is_zero() {
                    return Err(InvariantViolation::PositionLockWithZeroPosition(
                        account.id,
                        market.id,
                        outcome,
                    ));
                }
            }
        }
    }
    Ok(())
}

fn check_at_most_one_conditional_lock(
    risk: &RiskEngine,
    markets: &std::collections::HashMap<MarketId, Market>,
) -> Result<(), InvariantViolation> {
    for market_id in markets.keys() {
        for account in risk.accounts() {
            let has_cp = account.find_lock(*market_id, LockType::ConditionalProfit).is_some();
            let has_cl = account.find_lock(*market_id, LockType::ConditionalLoss).is_some();
            if has_cp && has_cl {
                return Err(InvariantViolation::BothConditionalLocksPresent(account.id, *market_id));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Credit, DEFAULT_MARKET_DP};
    use crate::types::Timestamp;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn fresh_engine_state_has_no_violations() {
        let mut risk = RiskEngine::new();
        let mut ledger = Ledger::new();
        let market = Market::create(
            &mut risk,
            &mut ledger,
            MarketId(1),
            vec!["yes".into(), "no".into()],
            dec!(100),
            DEFAULT_MARKET_DP,
            Timestamp::from_millis(0),
        )
        .unwrap();
        let mut markets = HashMap::new();
        markets.insert(market.id, market);

        assert!(InvariantChecker.check_all(&risk, &ledger, &markets).is_ok());
    }

    #[test]
    fn conservation_violation_is_detected_when_ledger_and_risk_diverge() {
        let mut risk = RiskEngine::new();
        let ledger = Ledger::new();
        let a = risk.open_account();
        // minted straight on the risk engine, bypassing the ledger.
        risk.mint(a, Credit::new(dec!(100)).unwrap()).unwrap();

        let result = check_credit_conservation(&risk, &ledger);
        assert!(matches!(result, Err(InvariantViolation::CreditConservation { .. })));
    }

    #[test]
    fn buy_then_sell_holds_all_live_invariants() {
        let mut risk = RiskEngine::new();
        let mut ledger = Ledger::new();
        let mut market = Market::create(
            &mut risk,
            &mut ledger,
            MarketId(1),
            vec!["yes".into(), "no".into()],
            dec!(100),
            DEFAULT_MARKET_DP,
            Timestamp::from_millis(0),
        )
        .unwrap();
        let trader = risk.open_account();
        risk.mint(trader, Credit::new(dec!(10000)).unwrap()).unwrap();
        ledger.record(
            trader,
            crate::decimal::SignedCredit::new(dec!(10000)).unwrap(),
            TxReason::Mint,
            None,
            None,
            None,
        );

        let delta = crate::decimal::Amount::new(dec!(10), DEFAULT_MARKET_DP).unwrap();
        let budget = Credit::new(dec!(1000)).unwrap();
        market.buy(&mut risk, &mut ledger, trader, 0, delta, budget).unwrap();

        let mut markets = HashMap::new();
        markets.insert(market.id, market);
        assert!(InvariantChecker.check_all(&risk, &ledger, &markets).is_ok());

        let market = markets.get_mut(&MarketId(1)).unwrap();
        market.sell(&mut risk, &mut ledger, trader, 0, delta).unwrap();
        assert!(InvariantChecker.check_all(&risk, &ledger, &markets).is_ok());
    }
}
