// 4.0: per-market state machine. a Market owns its q-vector, positions,
// trades, and its AMM account pointer; it orchestrates every trade by
// calling the risk engine (locks/balances) and the ledger (transactions).
// 4.1 has status/config, 4.2 the mutable state + constructor, 4.3 buy, 4.4
// sell, 4.5 liquidity changes, 4.6 resolve, 4.7 void.

use crate::conditional::net_conditional_pnl;
use crate::decimal::{Amount, Credit, Rounding, SignedCredit};
use crate::ledger::{Ledger, TxReason};
use crate::lmsr;
use crate::risk::{LockType, RiskEngine, RiskError};
use crate::types::{AccountId, MarketId, OutcomeIndex, Timestamp, TradeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    Open,
    Resolved,
    Void,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLeg {
    pub account_id: AccountId,
    pub available_delta: SignedCredit,
    pub frozen_delta: SignedCredit,
    pub lock_id: Option<crate::types::LockId>,
    pub tx_id: crate::types::TxId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub market_id: MarketId,
    pub outcome: OutcomeIndex,
    /// Signed token amount: positive for a buy, negative for a sell.
    pub amount: Decimal,
    pub price: Amount,
    pub buyer: Option<TradeLeg>,
    pub seller: Option<TradeLeg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("market {0} is not open")]
    MarketNotOpen(MarketId),
    #[error("outcome index {0} is not valid for this market")]
    UnknownOutcome(usize),
    #[error("trade amount must be strictly positive")]
    NonPositiveAmount,
    #[error("cost {cost} exceeds budget cap {budget_cap}")]
    BudgetExceeded { cost: Credit, budget_cap: Credit },
    #[error("account {account} holds only {held} of outcome {outcome}, cannot sell {requested}")]
    InsufficientPosition {
        account: AccountId,
        outcome: usize,
        held: Amount,
        requested: Amount,
    },
    #[error("removing {delta_b} of liquidity would breach the settlement-solvency invariant")]
    InsufficientSubsidy { delta_b: Decimal },
    #[error("liquidity delta must be strictly positive and, for removal, less than current b")]
    InvalidLiquidityDelta,
    #[error("market {market_id} subsidy reserve of {available} cannot cover a realized profit of {profit}")]
    ProfitExceedsSubsidy {
        market_id: MarketId,
        profit: Credit,
        available: Credit,
    },
    #[error(transparent)]
    Risk(#[from] RiskError),
    #[error(transparent)]
    Lmsr(#[from] lmsr::LmsrError),
    #[error(transparent)]
    Precision(#[from] crate::decimal::InvalidPrecision),
}

/// A single LMSR market. Positions are plain per-(account, outcome) token
/// balances; the matching position lock on the risk engine is always kept
/// equal to that account's cost basis for the outcome (§4.4 step 2 and 6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub amm_account_id: AccountId,
    pub status: MarketStatus,
    pub outcomes: Vec<String>,
    pub market_dp: u32,
    pub b: Decimal,
    pub q: Vec<Amount>,
    pub positions: HashMap<AccountId, HashMap<OutcomeIndex, Amount>>,
    pub trades: Vec<Trade>,
    pub deadline: Timestamp,
    pub resolution: Option<OutcomeIndex>,
}

impl Market {
    /// Opens a market: funds a fresh AMM account with `ceil(b*ln(n))`
    /// credits, locks them as its subsidy reserve, and starts `q` at zero
    /// (§4.4 "Create").
    pub fn create(
        risk: &mut RiskEngine,
        ledger: &mut Ledger,
        id: MarketId,
        outcomes: Vec<String>,
        b: Decimal,
        market_dp: u32,
        deadline: Timestamp,
    ) -> Result<Self, MarketError> {
        if outcomes.is_empty() {
            return Err(MarketError::UnknownOutcome(0));
        }
        let n = outcomes.len();
        let amm_account_id = risk.open_account();
        let subsidy = Credit::quantize(lmsr::worst_case_subsidy(b, n)?, Rounding::Ceil);

        risk.mint(amm_account_id, subsidy)?;
        ledger.record(
            amm_account_id,
            SignedCredit::from_credit(subsidy, false),
            TxReason::Mint,
            Some(id),
            None,
            None,
        );

        let lock_id = risk.lock(amm_account_id, id, subsidy, LockType::Subsidy)?;
        ledger.record(
            amm_account_id,
            SignedCredit::from_credit(subsidy, true),
            TxReason::Lock,
            Some(id),
            None,
            Some(lock_id),
        );

        Ok(Market {
            id,
            amm_account_id,
            status: MarketStatus::Open,
            outcomes,
            market_dp,
            b,
            q: vec![Amount::ZERO; n],
            positions: HashMap::new(),
            trades: Vec::new(),
            deadline,
            resolution: None,
        })
    }

    pub fn n_outcomes(&self) -> usize {
        self.outcomes.len()
    }

    fn require_open(&self) -> Result<(), MarketError> {
        if self.status != MarketStatus::Open {
            return Err(MarketError::MarketNotOpen(self.id));
        }
        Ok(())
    }

    fn require_outcome(&self, outcome: OutcomeIndex) -> Result<(), MarketError> {
        if outcome >= self.outcomes.len() {
            return Err(MarketError::UnknownOutcome(outcome));
        }
        Ok(())
    }

    fn q_values(&self) -> Vec<Decimal> {
        self.q.iter().map(|a| a.value()).collect()
    }

    pub fn position_of(&self, account_id: AccountId, outcome: OutcomeIndex) -> Amount {
        self.positions
            .get(&account_id)
            .and_then(|p| p.get(&outcome))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Unrounded price vector at the current `q`.
    pub fn raw_prices(&self) -> Result<Vec<Decimal>, MarketError> {
        Ok(lmsr::prices(&self.q_values(), self.b)?)
    }

    /// Price of a single outcome, quantized at market precision with the
    /// vector's residual ULPs folded into the largest component (§4.2).
    pub fn price(&self, outcome: OutcomeIndex) -> Result<Amount, MarketError> {
        self.require_outcome(outcome)?;
        let raw = self.raw_prices()?;
        let normalized = lmsr::normalize_prices(&raw, self.market_dp);
        Ok(Amount::new(normalized[outcome], self.market_dp).expect("normalize_prices already rounds to market_dp"))
    }

    pub fn prices(&self) -> Result<Vec<Amount>, MarketError> {
        let raw = self.raw_prices()?;
        let normalized = lmsr::normalize_prices(&raw, self.market_dp);
        Ok(normalized
            .into_iter()
            .map(|p| Amount::new(p, self.market_dp).expect("normalize_prices already rounds to market_dp"))
            .collect())
    }

    /// Buy `delta` tokens of `outcome` for `account`, paying at most
    /// `budget_cap` credits. See SPEC_FULL.md §4.4 for the numbered steps
    /// this follows.
    #[allow(clippy::too_many_arguments)]
    pub fn buy(
        &mut self,
        risk: &mut RiskEngine,
        ledger: &mut Ledger,
        account_id: AccountId,
        outcome: OutcomeIndex,
        delta: Amount,
        budget_cap: Credit,
    ) -> Result<Trade, MarketError> {
        self.require_open()?;
        self.require_outcome(outcome)?;
        if delta.is_zero() {
            return Err(MarketError::NonPositiveAmount);
        }

        // step 1: exact and quantized cost.
        let exact_cost = lmsr::cost_of_trade(&self.q_values(), self.b, outcome, delta.value())?;
        let cost = Credit::quantize(exact_cost, Rounding::Ceil);

        // step 2: budget check, no tolerance.
        if cost.value() > budget_cap.value() {
            return Err(MarketError::BudgetExceeded { cost, budget_cap });
        }

        // cost basis the buyer actually carries vs. the AMM's rounding dust
        // (§4.4 step 4): the buyer's own position lock is floor-quantized to
        // the exact cost; whatever ceil added on top is debited from the
        // same balance straight into the AMM's conditional-profit lock.
        let cost_basis = Credit::quantize(exact_cost, Rounding::Floor);
        let dust = cost.checked_sub(cost_basis).unwrap_or(Credit::ZERO);

        // the buyer's balance is about to be drawn down by `cost` total
        // across two separate risk-engine calls (the position lock, then
        // the dust debit); check the whole amount is available before
        // either one runs, so a rejection here leaves state untouched
        // instead of unwinding a half-applied trade (§4.3, §8 #12).
        if risk.account(account_id)?.balance().value() < cost.value() {
            return Err(RiskError::InsufficientBalance(account_id).into());
        }

        // assigned now, before either transaction is written, so both
        // legs' transactions can point back to it (§8 #11).
        let trade_id = TradeId(self.trades.len() as u64 + 1);

        // step 3: lock the buyer's cost basis as a position lock.
        let position_lock_id =
            risk.lock(account_id, self.id, cost_basis, LockType::Position(outcome))?;
        // the buyer's balance moves by the full `cost`, not just the
        // floor-quantized `cost_basis` that lands in the position lock —
        // `dust` leaves the same balance two steps down. Record the whole
        // draw here so this transaction's amount matches `buyer_leg`'s
        // `available_delta` (§8 #11).
        let lock_tx = ledger.record(
            account_id,
            SignedCredit::from_credit(cost, true),
            TxReason::Lock,
            Some(self.id),
            Some(trade_id),
            Some(position_lock_id),
        );

        // step 4: dust becomes the AMM's conditional-profit lock. Recorded
        // even when dust is zero so every trade emits exactly two
        // transactions (§8 #11). `debit_into_lock` never touches the AMM's
        // own balance — it debits the buyer and creates/grows a lock on the
        // AMM's account — so the AMM's own transaction amount is zero.
        let mut cp_lock_id = None;
        if !dust.is_zero() {
            cp_lock_id = Some(risk.debit_into_lock(
                account_id,
                self.amm_account_id,
                self.id,
                dust,
                LockType::ConditionalProfit,
            )?);
        }
        let dust_tx = ledger.record(
            self.amm_account_id,
            SignedCredit::new(Decimal::ZERO).expect("zero is always at credit precision"),
            TxReason::Lock,
            Some(self.id),
            Some(trade_id),
            cp_lock_id,
        );

        // step 5: update state.
        self.q[outcome] += delta;
        let account_positions = self.positions.entry(account_id).or_default();
        let held = account_positions.entry(outcome).or_insert(Amount::ZERO);
        *held = *held + delta;

        let price = self.price(outcome)?;

        // step 6: trade + transactions.
        let buyer_leg = TradeLeg {
            account_id,
            available_delta: SignedCredit::from_credit(cost, true),
            frozen_delta: SignedCredit::from_credit(cost_basis, false),
            lock_id: Some(position_lock_id),
            tx_id: lock_tx,
        };
        let seller_leg = TradeLeg {
            account_id: self.amm_account_id,
            available_delta: SignedCredit::new(Decimal::ZERO).expect("zero is always at credit precision"),
            frozen_delta: SignedCredit::from_credit(dust, false),
            lock_id: cp_lock_id,
            tx_id: dust_tx,
        };
        let trade = Trade {
            id: trade_id,
            market_id: self.id,
            outcome,
            amount: delta.value(),
            price,
            buyer: Some(buyer_leg),
            seller: Some(seller_leg),
        };
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Sell `delta` tokens of `outcome` held by `account`. See
    /// SPEC_FULL.md §4.4 for the numbered steps this follows.
    pub fn sell(
        &mut self,
        risk: &mut RiskEngine,
        ledger: &mut Ledger,
        account_id: AccountId,
        outcome: OutcomeIndex,
        delta: Amount,
    ) -> Result<Trade, MarketError> {
        self.require_open()?;
        self.require_outcome(outcome)?;
        if delta.is_zero() {
            return Err(MarketError::NonPositiveAmount);
        }

        let held = self.position_of(account_id, outcome);
        if held.value() < delta.value() {
            return Err(MarketError::InsufficientPosition {
                account: account_id,
                outcome,
                held,
                requested: delta,
            });
        }

        // step 1: exact and quantized proceeds.
        let exact_proceeds = lmsr::cost_of_trade(&self.q_values(), self.b, outcome, -delta.value())?;
        let proceeds = Credit::quantize(-exact_proceeds, Rounding::Floor);

        // step 2: weighted-average cost basis of the tokens being sold.
        let position_lock = risk
            .account(account_id)?
            .find_lock(self.id, LockType::Position(outcome))
            .cloned();
        let cost_basis = match &position_lock {
            Some(lock) if !held.is_zero() => {
                let ratio = delta.value() / held.value();
                Credit::quantize(lock.amount.value() * ratio, Rounding::Floor)
            }
            _ => Credit::ZERO,
        };

        // pnl is pure arithmetic over what's already been read above —
        // nothing has mutated yet. A profit draws down the AMM's subsidy
        // lock via `reassign_lock`, which can fail with `LockUnderflow` if
        // the subsidy can't cover it; check that up front, before step 3's
        // `unlock` runs, so a rejection leaves state untouched instead of
        // unwinding a half-applied trade (§4.3, §8 #12). A loss is always
        // safe to lock: it never exceeds the `cost_basis` step 3 is about
        // to credit back to the same balance.
        let pnl = proceeds.value() - cost_basis.value();
        let mut profit_amount = Credit::ZERO;
        let mut subsidy_lock_id = None;
        if pnl > Decimal::ZERO {
            let amount = Credit::new(pnl).expect("pnl is already at credit precision");
            if !amount.is_zero() {
                let subsidy_lock = risk
                    .account(self.amm_account_id)?
                    .find_lock(self.id, LockType::Subsidy)
                    .cloned()
                    .expect("subsidy lock always exists while market is open");
                if amount.value() > subsidy_lock.amount.value() {
                    return Err(MarketError::ProfitExceedsSubsidy {
                        market_id: self.id,
                        profit: amount,
                        available: subsidy_lock.amount,
                    });
                }
                profit_amount = amount;
                subsidy_lock_id = Some(subsidy_lock.id);
            }
        }

        // assigned now, before either transaction is written, so both
        // legs' transactions can point back to it (§8 #11).
        let trade_id = TradeId(self.trades.len() as u64 + 1);

        // step 3: release the cost basis from the position lock.
        if !cost_basis.is_zero() {
            if let Some(lock) = &position_lock {
                risk.unlock(lock.id, cost_basis)?;
            }
        }

        // step 4: pnl and the conditional lock it produces. A profit never
        // touches the seller's balance yet — the AMM's subsidy reserve is
        // drawn down by `pnl` and re-categorized straight into a CP lock on
        // the seller's own account, to be paid out only at resolution. A
        // loss is clawed back out of the balance the seller was just
        // credited in step 3.
        let mut pnl_lock_id = None;
        if !profit_amount.is_zero() {
            let subsidy_id = subsidy_lock_id.expect("profit_amount only set alongside subsidy_lock_id");
            pnl_lock_id = Some(risk.reassign_lock(
                subsidy_id,
                account_id,
                self.id,
                profit_amount,
                LockType::ConditionalProfit,
            )?);
        } else if pnl < Decimal::ZERO {
            let amount = Credit::new(-pnl).expect("pnl is already at credit precision");
            if !amount.is_zero() {
                pnl_lock_id = Some(risk.lock(account_id, self.id, amount, LockType::ConditionalLoss)?);
            }
        }

        // step 5: pnl netting for this account/market.
        net_conditional_pnl(risk, ledger, account_id, self.amm_account_id, self.id)?;

        // step 6: update position/q; convert residue into conditional_loss if closed out.
        self.q[outcome] = self.q[outcome] - delta;
        let account_positions = self.positions.entry(account_id).or_default();
        let remaining_held = account_positions
            .get_mut(&outcome)
            .expect("seller held this outcome, checked above");
        *remaining_held = *remaining_held - delta;
        let closed_out = remaining_held.is_zero();
        if closed_out {
            account_positions.remove(&outcome);
            if let Some(lock) = risk
                .account(account_id)?
                .find_lock(self.id, LockType::Position(outcome))
                .cloned()
            {
                risk.unlock(lock.id, lock.amount)?;
                let residue_amount = lock.amount;
                risk.lock(account_id, self.id, residue_amount, LockType::ConditionalLoss)?;
                net_conditional_pnl(risk, ledger, account_id, self.amm_account_id, self.id)?;
            }
        }

        let price = self.price(outcome)?;

        // step 7: trade + transactions. Both legs' recorded amounts are the
        // real balance deltas the steps above produced: the seller's
        // balance moved by `net_balance_delta` (the cost basis back, minus
        // a loss); the AMM's balance never moves here — `reassign_lock`
        // only re-categorizes one lock into another, it never touches
        // either side's balance (§8 #11).
        let net_balance_delta = if pnl < Decimal::ZERO {
            cost_basis.value() + pnl
        } else {
            cost_basis.value()
        };
        let seller_tx = ledger.record(
            account_id,
            SignedCredit::new(net_balance_delta).expect("net balance delta stays at credit precision"),
            TxReason::Unlock,
            Some(self.id),
            Some(trade_id),
            pnl_lock_id.or(position_lock.as_ref().map(|l| l.id)),
        );
        let amm_tx = ledger.record(
            self.amm_account_id,
            SignedCredit::new(Decimal::ZERO).expect("zero is always at credit precision"),
            TxReason::Unlock,
            Some(self.id),
            Some(trade_id),
            pnl_lock_id,
        );

        let seller_leg = TradeLeg {
            account_id,
            available_delta: SignedCredit::new(net_balance_delta).expect("net balance delta stays at credit precision"),
            frozen_delta: SignedCredit::from_credit(cost_basis, true),
            lock_id: pnl_lock_id.or(position_lock.as_ref().map(|l| l.id)),
            tx_id: seller_tx,
        };
        let amm_leg = TradeLeg {
            account_id: self.amm_account_id,
            available_delta: SignedCredit::new(Decimal::ZERO).expect("zero is always at credit precision"),
            frozen_delta: SignedCredit::from_credit(profit_amount, true),
            lock_id: pnl_lock_id,
            tx_id: amm_tx,
        };
        let trade = Trade {
            id: trade_id,
            market_id: self.id,
            outcome,
            amount: -delta.value(),
            price,
            buyer: Some(amm_leg),
            seller: Some(seller_leg),
        };
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Adds `delta_b` of liquidity: the AMM's subsidy lock grows by the
    /// increase in worst-case exposure, `q` is untouched so prices don't
    /// move (§4.4.2).
    pub fn add_liquidity(
        &mut self,
        risk: &mut RiskEngine,
        ledger: &mut Ledger,
        delta_b: Decimal,
    ) -> Result<(), MarketError> {
        self.require_open()?;
        if delta_b <= Decimal::ZERO {
            return Err(MarketError::InvalidLiquidityDelta);
        }
        let n = self.n_outcomes();
        let old_worst = lmsr::worst_case_subsidy(self.b, n)?;
        let new_worst = lmsr::worst_case_subsidy(self.b + delta_b, n)?;
        let delta_subsidy = Credit::quantize(new_worst - old_worst, Rounding::Ceil);

        if !delta_subsidy.is_zero() {
            let lock_id = risk.lock(self.amm_account_id, self.id, delta_subsidy, LockType::Subsidy)?;
            ledger.record(
                self.amm_account_id,
                SignedCredit::from_credit(delta_subsidy, true),
                TxReason::Lock,
                Some(self.id),
                None,
                Some(lock_id),
            );
        }
        self.b += delta_b;
        Ok(())
    }

    /// Removes `delta_b` of liquidity, refusing unless the post-removal
    /// subsidy still covers every possible settlement payout (§4.4.2,
    /// §9 "Settlement-solvency invariant"): for each outcome `o`, the
    /// credits owed if `o` wins (`q[o]`, 1:1 token-to-credit) must not
    /// exceed the subsidy lock that would remain.
    pub fn remove_liquidity(
        &mut self,
        risk: &mut RiskEngine,
        ledger: &mut Ledger,
        delta_b: Decimal,
    ) -> Result<(), MarketError> {
        self.require_open()?;
        if delta_b <= Decimal::ZERO || delta_b >= self.b {
            return Err(MarketError::InvalidLiquidityDelta);
        }
        let n = self.n_outcomes();
        let new_b = self.b - delta_b;
        let old_worst = lmsr::worst_case_subsidy(self.b, n)?;
        let new_worst = lmsr::worst_case_subsidy(new_b, n)?;
        let freed = Credit::quantize(old_worst - new_worst, Rounding::Floor);

        let subsidy_lock = risk
            .account(self.amm_account_id)?
            .find_lock(self.id, LockType::Subsidy)
            .cloned()
            .expect("subsidy lock always exists while market is open");
        if freed.value() > subsidy_lock.amount.value() {
            return Err(MarketError::InsufficientSubsidy { delta_b });
        }
        let remaining_subsidy = subsidy_lock
            .amount
            .checked_sub(freed)
            .expect("freed was just checked not to exceed the subsidy lock");

        for outcome_tokens in &self.q {
            let payout = Credit::quantize(outcome_tokens.value(), Rounding::Floor);
            if payout.value() > remaining_subsidy.value() {
                return Err(MarketError::InsufficientSubsidy { delta_b });
            }
        }

        if !freed.is_zero() {
            risk.unlock(subsidy_lock.id, freed)?;
            ledger.record(
                self.amm_account_id,
                SignedCredit::from_credit(freed, false),
                TxReason::Unlock,
                Some(self.id),
                None,
                Some(subsidy_lock.id),
            );
        }
        self.b = new_b;
        Ok(())
    }

    /// Resolves the market on `outcome` (§4.4.3): winners are paid 1:1 out
    /// of the AMM's subsidy and get their position lock back; every other
    /// outcome's position locks are forfeited to the AMM; every CP lock
    /// pays the trader and every CL lock pays the AMM; whatever subsidy
    /// remains becomes the AMM's realized profit.
    pub fn resolve(
        &mut self,
        risk: &mut RiskEngine,
        ledger: &mut Ledger,
        outcome: OutcomeIndex,
    ) -> Result<(), MarketError> {
        self.require_open()?;
        self.require_outcome(outcome)?;

        let winners: Vec<(AccountId, Amount)> = self
            .positions
            .iter()
            .filter_map(|(account_id, outs)| {
                outs.get(&outcome)
                    .filter(|held| !held.is_zero())
                    .map(|held| (*account_id, *held))
            })
            .collect();

        for (account_id, held) in winners {
            let payout = Credit::quantize(held.value(), Rounding::Floor);
            if !payout.is_zero() {
                let subsidy_lock = risk
                    .account(self.amm_account_id)?
                    .find_lock(self.id, LockType::Subsidy)
                    .cloned()
                    .expect("subsidy lock always exists while market is open");
                risk.transfer_locked(subsidy_lock.id, account_id, payout)?;
                // transfer_locked only shrinks the subsidy lock; the AMM's
                // own balance never moves on this side of the transfer.
                ledger.record(
                    self.amm_account_id,
                    SignedCredit::new(Decimal::ZERO).expect("zero is always at credit precision"),
                    TxReason::TransferLocked,
                    Some(self.id),
                    None,
                    Some(subsidy_lock.id),
                );
                ledger.record(
                    account_id,
                    SignedCredit::from_credit(payout, false),
                    TxReason::TransferLocked,
                    Some(self.id),
                    None,
                    Some(subsidy_lock.id),
                );
            }
            if let Some(lock) = risk
                .account(account_id)?
                .find_lock(self.id, LockType::Position(outcome))
                .cloned()
            {
                risk.unlock(lock.id, lock.amount)?;
                ledger.record(
                    account_id,
                    SignedCredit::from_credit(lock.amount, false),
                    TxReason::Unlock,
                    Some(self.id),
                    None,
                    Some(lock.id),
                );
            }
        }

        for losing_outcome in 0..self.n_outcomes() {
            if losing_outcome == outcome {
                continue;
            }
            let holders: Vec<AccountId> = self
                .positions
                .iter()
                .filter(|(_, outs)| outs.get(&losing_outcome).is_some_and(|a| !a.is_zero()))
                .map(|(account_id, _)| *account_id)
                .collect();
            for account_id in holders {
                if let Some(lock) = risk
                    .account(account_id)?
                    .find_lock(self.id, LockType::Position(losing_outcome))
                    .cloned()
                {
                    risk.transfer_locked(lock.id, self.amm_account_id, lock.amount)?;
                    // transfer_locked only shrinks the losing trader's
                    // position lock; their own balance never moves here.
                    ledger.record(
                        account_id,
                        SignedCredit::new(Decimal::ZERO).expect("zero is always at credit precision"),
                        TxReason::TransferLocked,
                        Some(self.id),
                        None,
                        Some(lock.id),
                    );
                    ledger.record(
                        self.amm_account_id,
                        SignedCredit::from_credit(lock.amount, false),
                        TxReason::TransferLocked,
                        Some(self.id),
                        None,
                        Some(lock.id),
                    );
                }
            }
        }

        let conditional_holders: Vec<AccountId> = risk
            .accounts()
            .filter(|a| {
                a.locks_for_market(self.id).any(|l| {
                    matches!(l.lock_type, LockType::ConditionalProfit | LockType::ConditionalLoss)
                })
            })
            .map(|a| a.id)
            .collect();
        for account_id in conditional_holders {
            if let Some(lock) = risk
                .account(account_id)?
                .find_lock(self.id, LockType::ConditionalProfit)
                .cloned()
            {
                risk.unlock(lock.id, lock.amount)?;
                ledger.record(
                    account_id,
                    SignedCredit::from_credit(lock.amount, false),
                    TxReason::Unlock,
                    Some(self.id),
                    None,
                    Some(lock.id),
                );
            }
            if let Some(lock) = risk
                .account(account_id)?
                .find_lock(self.id, LockType::ConditionalLoss)
                .cloned()
            {
                risk.transfer_locked(lock.id, self.amm_account_id, lock.amount)?;
                // transfer_locked only shrinks the CL holder's lock; their
                // own balance never moves here.
                ledger.record(
                    account_id,
                    SignedCredit::new(Decimal::ZERO).expect("zero is always at credit precision"),
                    TxReason::TransferLocked,
                    Some(self.id),
                    None,
                    Some(lock.id),
                );
                ledger.record(
                    self.amm_account_id,
                    SignedCredit::from_credit(lock.amount, false),
                    TxReason::TransferLocked,
                    Some(self.id),
                    None,
                    Some(lock.id),
                );
            }
        }

        if let Some(lock) = risk
            .account(self.amm_account_id)?
            .find_lock(self.id, LockType::Subsidy)
            .cloned()
        {
            risk.unlock(lock.id, lock.amount)?;
            ledger.record(
                self.amm_account_id,
                SignedCredit::from_credit(lock.amount, false),
                TxReason::Unlock,
                Some(self.id),
                None,
                Some(lock.id),
            );
        }

        self.status = MarketStatus::Resolved;
        self.resolution = Some(outcome);
        Ok(())
    }

    /// Reverses the market entirely (§4.4.4): every lock on this market, of
    /// any type and any owner, unlocks back to its own account. No credits
    /// change hands between accounts; everyone's `total` ends exactly where
    /// it started.
    pub fn void(&mut self, risk: &mut RiskEngine, ledger: &mut Ledger) -> Result<(), MarketError> {
        self.require_open()?;

        let account_ids: Vec<AccountId> = risk
            .accounts()
            .filter(|a| a.locks_for_market(self.id).next().is_some())
            .map(|a| a.id)
            .collect();

        for account_id in account_ids {
            let locks: Vec<(crate::types::LockId, Credit)> = risk
                .account(account_id)?
                .locks_for_market(self.id)
                .map(|l| (l.id, l.amount))
                .collect();
            for (lock_id, amount) in locks {
                risk.unlock(lock_id, amount)?;
                ledger.record(
                    account_id,
                    SignedCredit::from_credit(amount, false),
                    TxReason::Unlock,
                    Some(self.id),
                    None,
                    Some(lock_id),
                );
            }
        }

        self.status = MarketStatus::Void;
        Ok(())
    }
}
