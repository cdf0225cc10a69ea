// 8.1 engine/core.rs: the Engine struct itself plus account/market
// bookkeeping, mint/burn, and the deadline-driven tick() entry point (§5).
// trading.rs, liquidity.rs, settlement.rs, pricing.rs add the rest of
// Engine's public surface as impl blocks in their own files.

use super::config::EngineConfig;
use super::results::{EngineError, TickResult};
use crate::decimal::Credit;
use crate::events::{
    AccountOpenedEvent, BurnedEvent, Event, EventCollector, EventEmitter, EventPayload, MarketCreatedEvent,
    MintedEvent,
};
use crate::invariants::InvariantChecker;
use crate::ledger::{Ledger, TxReason};
use crate::market::Market;
use crate::risk::RiskEngine;
use crate::types::{AccountId, MarketId, Timestamp};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Everything a running engine owns. One value per embedder (§9: "the
/// engine is a single value; do not introduce process-wide singletons").
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) risk: RiskEngine,
    pub(super) ledger: Ledger,
    pub(super) markets: HashMap<MarketId, Market>,
    pub(super) events: EventCollector,
    pub(super) checker: InvariantChecker,
    pub(super) next_market_id: u32,
    pub(super) current_time: Timestamp,
}

/// An immutable, deep point-in-time view of engine state, sufficient to
/// prove "rejected operations leave state bitwise unchanged" (§8 #12) by
/// equality rather than by hashing.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub risk: RiskEngine,
    pub ledger: Ledger,
    pub markets: HashMap<MarketId, Market>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            risk: RiskEngine::new(),
            ledger: Ledger::new(),
            markets: HashMap::with_capacity(4),
            events: EventCollector::new(),
            checker: InvariantChecker,
            next_market_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn open_account(&mut self) -> AccountId {
        let id = self.risk.open_account();
        self.emit_event(EventPayload::AccountOpened(AccountOpenedEvent { account_id: id }));
        id
    }

    pub fn mint(&mut self, account_id: AccountId, amount: Credit) -> Result<(), EngineError> {
        self.risk.mint(account_id, amount)?;
        let tx_id = self.ledger.record(
            account_id,
            crate::decimal::SignedCredit::from_credit(amount, false),
            TxReason::Mint,
            None,
            None,
            None,
        );
        self.emit_event(EventPayload::Minted(MintedEvent { account_id, amount, tx_id }));
        self.check_invariants()?;
        Ok(())
    }

    pub fn burn(&mut self, account_id: AccountId, amount: Credit) -> Result<(), EngineError> {
        self.risk.burn(account_id, amount)?;
        let tx_id = self.ledger.record(
            account_id,
            crate::decimal::SignedCredit::from_credit(amount, true),
            TxReason::Burn,
            None,
            None,
            None,
        );
        self.emit_event(EventPayload::Burned(BurnedEvent { account_id, amount, tx_id }));
        self.check_invariants()?;
        Ok(())
    }

    pub fn create_market(
        &mut self,
        outcomes: Vec<String>,
        b: Decimal,
        market_dp: u32,
        deadline: Timestamp,
    ) -> Result<MarketId, EngineError> {
        let id = MarketId(self.next_market_id);
        let market = Market::create(&mut self.risk, &mut self.ledger, id, outcomes, b, market_dp, deadline)?;
        self.next_market_id += 1;

        let amm_account_id = market.amm_account_id;
        let subsidy = self
            .risk
            .account(amm_account_id)?
            .locks_for_market(id)
            .find(|l| matches!(l.lock_type, crate::risk::LockType::Subsidy))
            .map(|l| l.amount)
            .unwrap_or(Credit::ZERO);
        let outcomes = market.outcomes.clone();

        self.markets.insert(id, market);
        self.emit_event(EventPayload::MarketCreated(MarketCreatedEvent {
            market_id: id,
            amm_account_id,
            outcomes,
            b,
            subsidy,
            deadline,
        }));
        self.check_invariants()?;
        Ok(id)
    }

    pub fn get_market(&self, market_id: MarketId) -> Result<&Market, EngineError> {
        self.markets.get(&market_id).ok_or(EngineError::MarketNotFound(market_id))
    }

    pub(super) fn get_market_mut(&mut self, market_id: MarketId) -> Result<&mut Market, EngineError> {
        self.markets.get_mut(&market_id).ok_or(EngineError::MarketNotFound(market_id))
    }

    pub fn accounts_count(&self) -> usize {
        self.risk.accounts().count()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    /// Voids every `open` market whose deadline has passed. Returns the ids
    /// of the markets voided (§5: "deadline-driven voiding is triggered by
    /// the caller passing the current time to a `tick(now)` entry point").
    pub fn tick(&mut self, now: Timestamp) -> Result<TickResult, EngineError> {
        self.current_time = now;
        let expired: Vec<MarketId> = self
            .markets
            .values()
            .filter(|m| m.status == crate::market::MarketStatus::Open && m.deadline <= now)
            .map(|m| m.id)
            .collect();

        for market_id in &expired {
            self.void(*market_id)?;
        }

        Ok(TickResult { voided_markets: expired })
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(self.events.next_id(), self.current_time, payload);
        self.events.emit(event);
    }

    pub(super) fn check_invariants(&self) -> Result<(), EngineError> {
        if self.config.check_invariants {
            self.checker.check_all(&self.risk, &self.ledger, &self.markets)?;
        }
        Ok(())
    }
}
