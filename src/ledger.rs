//! The append-only transaction log. Every balance change the risk engine
//! performs is mirrored here as one or more `Transaction`s; replaying the
//! log from an empty ledger must reconstruct every account's balance
//! exactly (see `Ledger::replay`, exercised in `tests/solvency_tests.rs`).

use crate::decimal::{Credit, SignedCredit};
use crate::types::{AccountId, LockId, MarketId, TradeId, TxId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxReason {
    Mint,
    Burn,
    Lock,
    Unlock,
    TransferLocked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub account_id: AccountId,
    pub amount: SignedCredit,
    pub reason: TxReason,
    pub market_id: Option<MarketId>,
    pub trade_id: Option<TradeId>,
    pub lock_id: Option<LockId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("replay encountered a burn exceeding the running balance for account {0}")]
    ReplayWentNegative(AccountId),
}

/// Append-only. Nothing in this crate ever removes or edits a `Transaction`
/// once written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    next_tx_id: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
            next_tx_id: 1,
        }
    }

    fn next_id(&mut self) -> TxId {
        let id = TxId(self.next_tx_id);
        self.next_tx_id += 1;
        id
    }

    pub fn record(
        &mut self,
        account_id: AccountId,
        amount: SignedCredit,
        reason: TxReason,
        market_id: Option<MarketId>,
        trade_id: Option<TradeId>,
        lock_id: Option<LockId>,
    ) -> TxId {
        let id = self.next_id();
        self.transactions.push(Transaction {
            id,
            account_id,
            amount,
            reason,
            market_id,
            trade_id,
            lock_id,
        });
        id
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transactions_for_trade(&self, trade_id: TradeId) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.trade_id == Some(trade_id))
            .collect()
    }

    /// Reconstructs every account's balance from scratch by folding over
    /// the full transaction log. Used to prove "replaying transactions
    /// from an empty ledger reconstructs all account balances exactly."
    pub fn replay(&self) -> Result<HashMap<AccountId, Credit>, LedgerError> {
        let mut balances: HashMap<AccountId, rust_decimal::Decimal> = HashMap::new();
        for tx in &self.transactions {
            let entry = balances.entry(tx.account_id).or_insert(rust_decimal::Decimal::ZERO);
            *entry += tx.amount.value();
            if *entry < rust_decimal::Decimal::ZERO {
                return Err(LedgerError::ReplayWentNegative(tx.account_id));
            }
        }
        Ok(balances
            .into_iter()
            .map(|(id, v)| (id, Credit::new(v).expect("replay-accumulated value stays at credit precision")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn replay_reconstructs_balance_from_empty_ledger() {
        let mut ledger = Ledger::new();
        let a = AccountId(1);
        ledger.record(a, SignedCredit::new(dec!(100)).unwrap(), TxReason::Mint, None, None, None);
        ledger.record(a, SignedCredit::new(dec!(-30)).unwrap(), TxReason::Lock, None, None, None);
        ledger.record(a, SignedCredit::new(dec!(30)).unwrap(), TxReason::Unlock, None, None, None);

        let balances = ledger.replay().unwrap();
        assert_eq!(balances[&a].value(), dec!(100));
    }

    #[test]
    fn replay_detects_negative_balance() {
        let mut ledger = Ledger::new();
        let a = AccountId(1);
        ledger.record(a, SignedCredit::new(dec!(-10)).unwrap(), TxReason::Burn, None, None, None);
        assert!(ledger.replay().is_err());
    }

    #[test]
    fn transactions_for_trade_filters_by_id() {
        let mut ledger = Ledger::new();
        let a = AccountId(1);
        let trade = TradeId(7);
        ledger.record(a, SignedCredit::new(dec!(10)).unwrap(), TxReason::TransferLocked, None, Some(trade), None);
        ledger.record(a, SignedCredit::new(dec!(5)).unwrap(), TxReason::Mint, None, None, None);
        assert_eq!(ledger.transactions_for_trade(trade).len(), 1);
    }

    #[test]
    fn tx_ids_are_monotonic() {
        let mut ledger = Ledger::new();
        let a = AccountId(1);
        let id1 = ledger.record(a, SignedCredit::new(dec!(1)).unwrap(), TxReason::Mint, None, None, None);
        let id2 = ledger.record(a, SignedCredit::new(dec!(1)).unwrap(), TxReason::Mint, None, None, None);
        assert!(id2.0 > id1.0);
    }
}
