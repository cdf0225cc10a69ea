// 8.0.2: result types and the aggregated engine error.

use crate::invariants::InvariantViolation;
use crate::ledger::LedgerError;
use crate::market::MarketError;
use crate::risk::RiskError;
use crate::types::{AccountId, MarketId};

#[derive(Debug, Clone)]
pub struct TickResult {
    pub voided_markets: Vec<MarketId>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("risk engine error: {0}")]
    Risk(#[from] RiskError),

    #[error("market error: {0}")]
    Market(#[from] MarketError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
}
