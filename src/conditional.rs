//! Conditional profit/loss netting (§4.4.1). A trader can hold at most one
//! conditional lock — CP or CL — per (account, market) at any time. Selling
//! at a profit escrows the AMM's liability as a CP lock on the trader's own
//! account (funded by reassigning credits out of the AMM's subsidy
//! reserve); selling at a loss locks the trader's own balance as CL. When
//! both exist simultaneously they cancel: whichever portion offsets returns
//! to its original funder rather than staying escrowed until resolution,
//! since that portion is no longer contingent on anything.

use crate::decimal::SignedCredit;
use crate::ledger::{Ledger, TxReason};
use crate::risk::{LockType, RiskEngine, RiskError};
use crate::types::{AccountId, MarketId};
use rust_decimal::Decimal;

/// Cancels a trader's CP lock against their CL lock on the same market, if
/// both currently exist. The smaller of the two is fully drained; the
/// larger survives with its amount reduced by the same quantity. Returning
/// credits go back to whoever originally funded that portion: the forgiven
/// loss goes back to the trader's own balance, the cancelled profit claim
/// goes back into the AMM's subsidy reserve.
pub fn net_conditional_pnl(
    risk: &mut RiskEngine,
    ledger: &mut Ledger,
    account_id: AccountId,
    amm_account_id: AccountId,
    market_id: MarketId,
) -> Result<(), RiskError> {
    let cp = risk
        .account(account_id)?
        .find_lock(market_id, LockType::ConditionalProfit)
        .cloned();
    let cl = risk
        .account(account_id)?
        .find_lock(market_id, LockType::ConditionalLoss)
        .cloned();

    let (cp, cl) = match (cp, cl) {
        (Some(cp), Some(cl)) => (cp, cl),
        _ => return Ok(()),
    };

    let offset = cp.amount.min(cl.amount);
    if offset.is_zero() {
        return Ok(());
    }

    risk.unlock(cl.id, offset)?;
    ledger.record(
        account_id,
        SignedCredit::from_credit(offset, false),
        TxReason::Unlock,
        Some(market_id),
        None,
        Some(cl.id),
    );

    risk.reassign_lock(cp.id, amm_account_id, market_id, offset, LockType::Subsidy)?;
    // reassign_lock only moves credits from one lock to another; the AMM's
    // own balance never moves here.
    ledger.record(
        amm_account_id,
        SignedCredit::new(Decimal::ZERO).expect("zero is always at credit precision"),
        TxReason::Lock,
        Some(market_id),
        None,
        Some(cp.id),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Credit, Rounding};
    use crate::lmsr;
    use rust_decimal_macros::dec;

    fn setup() -> (RiskEngine, Ledger, AccountId, AccountId, MarketId) {
        let mut risk = RiskEngine::new();
        let ledger = Ledger::new();
        let amm = risk.open_account();
        let trader = risk.open_account();
        let market = MarketId(1);
        let subsidy = Credit::quantize(lmsr::worst_case_subsidy(dec!(100), 2).unwrap(), Rounding::Ceil);
        risk.mint(amm, subsidy).unwrap();
        risk.lock(amm, market, subsidy, LockType::Subsidy).unwrap();
        (risk, ledger, amm, trader, market)
    }

    #[test]
    fn equal_cp_and_cl_fully_cancel() {
        let (mut risk, mut ledger, amm, trader, market) = setup();
        let amount = Credit::new(dec!(10)).unwrap();
        let subsidy_lock = risk.account(amm).unwrap().find_lock(market, LockType::Subsidy).unwrap().id;
        risk.reassign_lock(subsidy_lock, trader, market, amount, LockType::ConditionalProfit).unwrap();
        risk.mint(trader, amount).unwrap();
        risk.lock(trader, market, amount, LockType::ConditionalLoss).unwrap();

        net_conditional_pnl(&mut risk, &mut ledger, trader, amm, market).unwrap();

        assert!(risk.account(trader).unwrap().find_lock(market, LockType::ConditionalProfit).is_none());
        assert!(risk.account(trader).unwrap().find_lock(market, LockType::ConditionalLoss).is_none());
    }

    #[test]
    fn larger_cl_survives_reduced() {
        let (mut risk, mut ledger, amm, trader, market) = setup();
        let cp_amount = Credit::new(dec!(4)).unwrap();
        let cl_amount = Credit::new(dec!(10)).unwrap();
        let subsidy_lock = risk.account(amm).unwrap().find_lock(market, LockType::Subsidy).unwrap().id;
        risk.reassign_lock(subsidy_lock, trader, market, cp_amount, LockType::ConditionalProfit).unwrap();
        risk.mint(trader, cl_amount).unwrap();
        risk.lock(trader, market, cl_amount, LockType::ConditionalLoss).unwrap();

        net_conditional_pnl(&mut risk, &mut ledger, trader, amm, market).unwrap();

        assert!(risk.account(trader).unwrap().find_lock(market, LockType::ConditionalProfit).is_none());
        let remaining = risk.account(trader).unwrap().find_lock(market, LockType::ConditionalLoss).unwrap();
        assert_eq!(remaining.amount.value(), dec!(6));
    }

    #[test]
    fn only_one_side_present_is_a_no_op() {
        let (mut risk, mut ledger, amm, trader, market) = setup();
        let amount = Credit::new(dec!(5)).unwrap();
        let subsidy_lock = risk.account(amm).unwrap().find_lock(market, LockType::Subsidy).unwrap().id;
        risk.reassign_lock(subsidy_lock, trader, market, amount, LockType::ConditionalProfit).unwrap();

        net_conditional_pnl(&mut risk, &mut ledger, trader, amm, market).unwrap();

        assert_eq!(
            risk.account(trader).unwrap().find_lock(market, LockType::ConditionalProfit).unwrap().amount.value(),
            dec!(5)
        );
    }
}
