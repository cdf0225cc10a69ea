//! The risk engine: accounts, balances, and itemized locks.
//!
//! An account's `total` is `balance + frozen`, where `frozen` is always the
//! sum of that account's locks — there is no separate frozen counter to let
//! drift in. The AMM of a market is an ordinary account here; nothing in this
//! module distinguishes it from a trader's account. See `invariants.rs` for
//! the cross-checks that hold this together.

use crate::decimal::Credit;
use crate::types::{AccountId, LockId, MarketId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockType {
    /// Per-outcome token holdings; funds the cost basis of a position.
    Position(crate::types::OutcomeIndex),
    /// AMM's worst-case reserve, `>= b * ln(n)` while a market is open.
    Subsidy,
    /// Unrealized gain from a sell, held until resolution.
    ConditionalProfit,
    /// Unrealized loss from a sell, held until resolution.
    ConditionalLoss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    pub account_id: AccountId,
    pub market_id: MarketId,
    pub amount: Credit,
    pub lock_type: LockType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    balance: Credit,
    locks: HashMap<LockId, Lock>,
}

impl Account {
    fn new(id: AccountId) -> Self {
        Self {
            id,
            balance: Credit::ZERO,
            locks: HashMap::new(),
        }
    }

    pub fn balance(&self) -> Credit {
        self.balance
    }

    pub fn frozen(&self) -> Credit {
        self.locks.values().map(|l| l.amount).sum()
    }

    pub fn total(&self) -> Credit {
        self.balance.checked_add(self.frozen())
    }

    pub fn locks(&self) -> impl Iterator<Item = &Lock> {
        self.locks.values()
    }

    pub fn lock(&self, lock_id: LockId) -> Option<&Lock> {
        self.locks.get(&lock_id)
    }

    pub fn locks_for_market(&self, market_id: MarketId) -> impl Iterator<Item = &Lock> {
        self.locks.values().filter(move |l| l.market_id == market_id)
    }

    pub fn find_lock(&self, market_id: MarketId, lock_type: LockType) -> Option<&Lock> {
        self.locks
            .values()
            .find(|l| l.market_id == market_id && l.lock_type == lock_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RiskError {
    #[error("account {0} has insufficient balance for this operation")]
    InsufficientBalance(AccountId),
    #[error("account {0} is unknown to the risk engine")]
    UnknownAccount(AccountId),
    #[error("lock {0} is unknown to the risk engine")]
    UnknownLock(LockId),
    #[error("unlock of {requested} exceeds lock {lock_id} amount {available}")]
    LockUnderflow {
        lock_id: LockId,
        requested: Credit,
        available: Credit,
    },
    #[error("burn of {requested} exceeds account {account_id} balance {available}")]
    BurnExceedsBalance {
        account_id: AccountId,
        requested: Credit,
        available: Credit,
    },
}

/// Accounts, balances, and locks. No transaction is ever written here —
/// that is the ledger's job; this engine only mutates balances/locks and
/// reports what moved so the caller (the market engine, via the ledger) can
/// record it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEngine {
    accounts: HashMap<AccountId, Account>,
    next_account_id: u64,
    next_lock_id: u64,
}

impl RiskEngine {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            next_account_id: 1,
            next_lock_id: 1,
        }
    }

    pub fn open_account(&mut self) -> AccountId {
        let id = AccountId(self.next_account_id);
        self.next_account_id += 1;
        self.accounts.insert(id, Account::new(id));
        id
    }

    pub fn account(&self, id: AccountId) -> Result<&Account, RiskError> {
        self.accounts.get(&id).ok_or(RiskError::UnknownAccount(id))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, RiskError> {
        self.accounts.get_mut(&id).ok_or(RiskError::UnknownAccount(id))
    }

    /// Privileged: credits never enter the engine any other way.
    pub fn mint(&mut self, account_id: AccountId, amount: Credit) -> Result<(), RiskError> {
        let account = self.account_mut(account_id)?;
        account.balance = account.balance.checked_add(amount);
        Ok(())
    }

    /// Privileged: credits never leave the engine any other way.
    pub fn burn(&mut self, account_id: AccountId, amount: Credit) -> Result<(), RiskError> {
        let account = self.account_mut(account_id)?;
        if account.balance < amount {
            return Err(RiskError::BurnExceedsBalance {
                account_id,
                requested: amount,
                available: account.balance,
            });
        }
        account.balance = account
            .balance
            .checked_sub(amount)
            .expect("checked by the comparison above");
        Ok(())
    }

    /// Moves `amount` from `balance` to a new (or merged) lock. No budget
    /// tolerance: even a shortfall of one credit-precision ULP rejects, and
    /// a rejection leaves the account untouched.
    pub fn lock(
        &mut self,
        account_id: AccountId,
        market_id: MarketId,
        amount: Credit,
        lock_type: LockType,
    ) -> Result<LockId, RiskError> {
        let account = self.accounts.get_mut(&account_id).ok_or(RiskError::UnknownAccount(account_id))?;
        if account.balance < amount {
            return Err(RiskError::InsufficientBalance(account_id));
        }

        if let Some(existing) = account
            .locks
            .values_mut()
            .find(|l| l.market_id == market_id && l.lock_type == lock_type)
        {
            existing.amount = existing.amount.checked_add(amount);
            account.balance = account
                .balance
                .checked_sub(amount)
                .expect("checked by the comparison above");
            return Ok(existing.id);
        }

        let lock_id = LockId(self.next_lock_id);
        self.next_lock_id += 1;
        let account = self.accounts.get_mut(&account_id).ok_or(RiskError::UnknownAccount(account_id))?;
        account.balance = account
            .balance
            .checked_sub(amount)
            .expect("checked by the comparison above");
        account.locks.insert(
            lock_id,
            Lock {
                id: lock_id,
                account_id,
                market_id,
                amount,
                lock_type,
            },
        );
        Ok(lock_id)
    }

    /// Debits `amount` from `payer`'s available balance and locks it under
    /// `payee` (new lock, or merged into an existing one of the same market
    /// and type). Used where a trade's counterparty, not the payer, ends up
    /// holding the escrowed credits — e.g. a buy's rounding dust becomes the
    /// AMM's conditional-profit lock (§4.4 step 4) even though the buyer is
    /// the one whose balance funded it.
    pub fn debit_into_lock(
        &mut self,
        payer: AccountId,
        payee: AccountId,
        market_id: MarketId,
        amount: Credit,
        lock_type: LockType,
    ) -> Result<LockId, RiskError> {
        {
            let payer_account = self.account_mut(payer)?;
            if payer_account.balance < amount {
                return Err(RiskError::InsufficientBalance(payer));
            }
            payer_account.balance = payer_account
                .balance
                .checked_sub(amount)
                .expect("checked by the comparison above");
        }
        let payee_account = self.accounts.get_mut(&payee).ok_or(RiskError::UnknownAccount(payee))?;
        if let Some(existing) = payee_account
            .locks
            .values_mut()
            .find(|l| l.market_id == market_id && l.lock_type == lock_type)
        {
            existing.amount = existing.amount.checked_add(amount);
            return Ok(existing.id);
        }
        let lock_id = LockId(self.next_lock_id);
        self.next_lock_id += 1;
        payee_account.locks.insert(
            lock_id,
            Lock {
                id: lock_id,
                account_id: payee,
                market_id,
                amount,
                lock_type,
            },
        );
        Ok(lock_id)
    }

    /// Recategorizes `amount` directly from one lock into another, which may
    /// belong to a different account and a different lock type, without
    /// ever passing through anyone's available balance. Used where a lock's
    /// purpose changes in place — e.g. a profitable sell moves part of the
    /// AMM's own subsidy reserve into an AMM-held conditional-profit lock,
    /// which is a liability re-categorization, not a payment (§4.4 step 4).
    pub fn reassign_lock(
        &mut self,
        from_lock_id: LockId,
        to_account_id: AccountId,
        to_market_id: MarketId,
        amount: Credit,
        to_lock_type: LockType,
    ) -> Result<LockId, RiskError> {
        let from_account_id = self.locate(from_lock_id)?;
        {
            let from_account = self.account_mut(from_account_id)?;
            let lock = from_account
                .locks
                .get_mut(&from_lock_id)
                .ok_or(RiskError::UnknownLock(from_lock_id))?;
            if amount > lock.amount {
                return Err(RiskError::LockUnderflow {
                    lock_id: from_lock_id,
                    requested: amount,
                    available: lock.amount,
                });
            }
            let remaining = lock
                .amount
                .checked_sub(amount)
                .expect("checked by the comparison above");
            if remaining.is_zero() {
                from_account.locks.remove(&from_lock_id);
            } else {
                lock.amount = remaining;
            }
        }
        let to_account = self.accounts.get_mut(&to_account_id).ok_or(RiskError::UnknownAccount(to_account_id))?;
        if let Some(existing) = to_account
            .locks
            .values_mut()
            .find(|l| l.market_id == to_market_id && l.lock_type == to_lock_type)
        {
            existing.amount = existing.amount.checked_add(amount);
            return Ok(existing.id);
        }
        let lock_id = LockId(self.next_lock_id);
        self.next_lock_id += 1;
        to_account.locks.insert(
            lock_id,
            Lock {
                id: lock_id,
                account_id: to_account_id,
                market_id: to_market_id,
                amount,
                lock_type: to_lock_type,
            },
        );
        Ok(lock_id)
    }

    /// Moves `amount` back from a lock to the owning account's balance.
    /// Removes the lock entirely once its residue reaches zero.
    pub fn unlock(&mut self, lock_id: LockId, amount: Credit) -> Result<(), RiskError> {
        let account_id = self.locate(lock_id)?;
        let account = self.account_mut(account_id)?;
        let lock = account.locks.get_mut(&lock_id).ok_or(RiskError::UnknownLock(lock_id))?;
        if amount > lock.amount {
            return Err(RiskError::LockUnderflow {
                lock_id,
                requested: amount,
                available: lock.amount,
            });
        }
        let remaining = lock
            .amount
            .checked_sub(amount)
            .expect("checked by the comparison above");
        if remaining.is_zero() {
            account.locks.remove(&lock_id);
        } else {
            lock.amount = remaining;
        }
        account.balance = account.balance.checked_add(amount);
        Ok(())
    }

    /// Moves credits from a lock's frozen bucket directly into another
    /// account's available balance, skipping the originating account's
    /// balance entirely. Used for settlement payouts (resolve/void), where
    /// the credits belong to someone other than the lock's owner.
    pub fn transfer_locked(
        &mut self,
        from_lock_id: LockId,
        to_account_id: AccountId,
        amount: Credit,
    ) -> Result<(), RiskError> {
        let from_account_id = self.locate(from_lock_id)?;
        {
            let from_account = self.account_mut(from_account_id)?;
            let lock = from_account
                .locks
                .get_mut(&from_lock_id)
                .ok_or(RiskError::UnknownLock(from_lock_id))?;
            if amount > lock.amount {
                return Err(RiskError::LockUnderflow {
                    lock_id: from_lock_id,
                    requested: amount,
                    available: lock.amount,
                });
            }
            let remaining = lock
                .amount
                .checked_sub(amount)
                .expect("checked by the comparison above");
            if remaining.is_zero() {
                from_account.locks.remove(&from_lock_id);
            } else {
                lock.amount = remaining;
            }
        }
        let to_account = self.account_mut(to_account_id)?;
        to_account.balance = to_account.balance.checked_add(amount);
        Ok(())
    }

    fn locate(&self, lock_id: LockId) -> Result<AccountId, RiskError> {
        self.accounts
            .values()
            .find(|a| a.locks.contains_key(&lock_id))
            .map(|a| a.id)
            .ok_or(RiskError::UnknownLock(lock_id))
    }

    pub fn global_total(&self) -> Credit {
        self.accounts.values().map(|a| a.total()).sum()
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn credit(v: rust_decimal::Decimal) -> Credit {
        Credit::new(v).unwrap()
    }

    #[test]
    fn mint_increases_balance() {
        let mut engine = RiskEngine::new();
        let a = engine.open_account();
        engine.mint(a, credit(dec!(100))).unwrap();
        assert_eq!(engine.account(a).unwrap().balance().value(), dec!(100));
    }

    #[test]
    fn burn_rejects_over_balance() {
        let mut engine = RiskEngine::new();
        let a = engine.open_account();
        engine.mint(a, credit(dec!(10))).unwrap();
        assert!(engine.burn(a, credit(dec!(20))).is_err());
        assert_eq!(engine.account(a).unwrap().balance().value(), dec!(10));
    }

    #[test]
    fn lock_moves_balance_to_frozen() {
        let mut engine = RiskEngine::new();
        let a = engine.open_account();
        let m = MarketId(1);
        engine.mint(a, credit(dec!(100))).unwrap();
        engine.lock(a, m, credit(dec!(30)), LockType::Subsidy).unwrap();
        let acc = engine.account(a).unwrap();
        assert_eq!(acc.balance().value(), dec!(70));
        assert_eq!(acc.frozen().value(), dec!(30));
        assert_eq!(acc.total().value(), dec!(100));
    }

    #[test]
    fn lock_rejects_insufficient_balance_with_no_tolerance() {
        let mut engine = RiskEngine::new();
        let a = engine.open_account();
        let m = MarketId(1);
        engine.mint(a, credit(dec!(10))).unwrap();
        let result = engine.lock(a, m, credit(dec!(10.000001)), LockType::Subsidy);
        assert!(result.is_err());
        assert_eq!(engine.account(a).unwrap().balance().value(), dec!(10));
    }

    #[test]
    fn lock_merges_same_market_and_type() {
        let mut engine = RiskEngine::new();
        let a = engine.open_account();
        let m = MarketId(1);
        engine.mint(a, credit(dec!(100))).unwrap();
        let l1 = engine.lock(a, m, credit(dec!(10)), LockType::Subsidy).unwrap();
        let l2 = engine.lock(a, m, credit(dec!(5)), LockType::Subsidy).unwrap();
        assert_eq!(l1, l2);
        assert_eq!(
            engine.account(a).unwrap().lock(l1).unwrap().amount.value(),
            dec!(15)
        );
    }

    #[test]
    fn unlock_removes_lock_at_zero_residue() {
        let mut engine = RiskEngine::new();
        let a = engine.open_account();
        let m = MarketId(1);
        engine.mint(a, credit(dec!(100))).unwrap();
        let lock_id = engine.lock(a, m, credit(dec!(10)), LockType::Subsidy).unwrap();
        engine.unlock(lock_id, credit(dec!(10))).unwrap();
        assert!(engine.account(a).unwrap().lock(lock_id).is_none());
        assert_eq!(engine.account(a).unwrap().balance().value(), dec!(100));
    }

    #[test]
    fn unlock_underflow_rejects() {
        let mut engine = RiskEngine::new();
        let a = engine.open_account();
        let m = MarketId(1);
        engine.mint(a, credit(dec!(100))).unwrap();
        let lock_id = engine.lock(a, m, credit(dec!(10)), LockType::Subsidy).unwrap();
        assert!(engine.unlock(lock_id, credit(dec!(20))).is_err());
    }

    #[test]
    fn transfer_locked_moves_to_other_account_balance() {
        let mut engine = RiskEngine::new();
        let amm = engine.open_account();
        let trader = engine.open_account();
        let m = MarketId(1);
        engine.mint(amm, credit(dec!(100))).unwrap();
        let lock_id = engine.lock(amm, m, credit(dec!(50)), LockType::Subsidy).unwrap();
        engine.transfer_locked(lock_id, trader, credit(dec!(50))).unwrap();
        assert_eq!(engine.account(trader).unwrap().balance().value(), dec!(50));
        assert!(engine.account(amm).unwrap().lock(lock_id).is_none());
    }

    #[test]
    fn global_total_conserved_across_lock_unlock() {
        let mut engine = RiskEngine::new();
        let a = engine.open_account();
        engine.mint(a, credit(dec!(100))).unwrap();
        let before = engine.global_total();
        engine
            .lock(a, MarketId(1), credit(dec!(40)), LockType::Subsidy)
            .unwrap();
        assert_eq!(engine.global_total(), before);
    }
}
