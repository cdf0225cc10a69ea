// 11.0: every state change produces an event. used for audit trails, state reconstruction,
// and notifying external systems. the EventPayload enum lists all event types.

use crate::decimal::{Amount, Credit};
use crate::types::{AccountId, MarketId, OutcomeIndex, Timestamp, TradeId, TxId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    AccountOpened(AccountOpenedEvent),
    Minted(MintedEvent),
    Burned(BurnedEvent),
    MarketCreated(MarketCreatedEvent),
    TradeExecuted(TradeExecutedEvent),
    LiquidityAdded(LiquidityAddedEvent),
    LiquidityRemoved(LiquidityRemovedEvent),
    MarketResolved(MarketResolvedEvent),
    MarketVoided(MarketVoidedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountOpenedEvent {
    pub account_id: AccountId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintedEvent {
    pub account_id: AccountId,
    pub amount: Credit,
    pub tx_id: TxId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnedEvent {
    pub account_id: AccountId,
    pub amount: Credit,
    pub tx_id: TxId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketCreatedEvent {
    pub market_id: MarketId,
    pub amm_account_id: AccountId,
    pub outcomes: Vec<String>,
    pub b: Decimal,
    pub subsidy: Credit,
    pub deadline: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecutedEvent {
    pub market_id: MarketId,
    pub trade_id: TradeId,
    pub outcome: OutcomeIndex,
    pub amount: Decimal,
    pub price: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityAddedEvent {
    pub market_id: MarketId,
    pub delta_b: Decimal,
    pub new_b: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityRemovedEvent {
    pub market_id: MarketId,
    pub delta_b: Decimal,
    pub new_b: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketResolvedEvent {
    pub market_id: MarketId,
    pub outcome: OutcomeIndex,
    pub amm_realized: Credit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketVoidedEvent {
    pub market_id: MarketId,
    pub locks_released: usize,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn event_collector_emits_and_clears() {
        let mut collector = EventCollector::new();

        let event = Event::new(
            collector.next_id(),
            Timestamp::from_millis(1000),
            EventPayload::MarketCreated(MarketCreatedEvent {
                market_id: MarketId(1),
                amm_account_id: AccountId(1),
                outcomes: vec!["yes".into(), "no".into()],
                b: dec!(100),
                subsidy: Credit::new(dec!(69.314718)).unwrap(),
                deadline: Timestamp::from_millis(0),
            }),
        );

        collector.emit(event);
        assert_eq!(collector.events().len(), 1);

        collector.clear();
        assert!(collector.events().is_empty());
    }

    #[test]
    fn trade_executed_event_creation() {
        let event = TradeExecutedEvent {
            market_id: MarketId(1),
            trade_id: TradeId(1),
            outcome: 0,
            amount: dec!(10),
            price: Amount::new(dec!(0.55), 4).unwrap(),
        };

        assert_eq!(event.market_id.0, 1);
        assert_eq!(event.price.value(), dec!(0.55));
    }
}
