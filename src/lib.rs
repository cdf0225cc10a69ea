// lmsr-core: the credit ledger and LMSR market engine behind a conditional
// prediction-market system. deterministic, single-writer, synchronous, no
// external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: ids (AccountId, MarketId, LockId, TradeId, TxId), OutcomeIndex, Timestamp
//   2.x  decimal.rs: fixed-point contract: Credit, SignedCredit, Amount, Rounding
//   3.x  lmsr.rs: pure cost/price/cost-of-trade math, overflow-safe
//   4.x  risk.rs: Account, Lock, LockType, mint/burn/lock/unlock/transfer_locked
//   5.x  ledger.rs: Transaction, append-only Ledger, replay reconstruction
//   conditional.rs: conditional profit/loss (CP/CL) netting
//   6.x  market.rs: Market, MarketStatus, Trade/TradeLeg, buy/sell/liquidity/resolve/void
//   7.x  invariants.rs: the cross-domain invariant checker
//   events.rs: append-only audit event stream
//   config.rs: crate-wide precision constants and market defaults
//   8.x  engine/: the public Engine: core, trading, liquidity, settlement, pricing, config, results

pub mod conditional;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod events;
pub mod invariants;
pub mod ledger;
pub mod lmsr;
pub mod market;
pub mod risk;
pub mod types;

pub use decimal::{Amount, Credit, InvalidPrecision, Rounding, SignedCredit, CREDITS_DP, DEFAULT_MARKET_DP};
pub use engine::{Engine, EngineConfig, EngineError};
pub use ledger::{Ledger, LedgerError, Transaction, TxReason};
pub use market::{Market, MarketError, MarketStatus, Trade, TradeLeg};
pub use risk::{Account, Lock, LockType, RiskEngine, RiskError};
pub use types::{AccountId, LockId, MarketId, OutcomeIndex, Timestamp, TradeId, TxId};
