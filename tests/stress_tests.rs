//! Stress tests.
//!
//! Long random/bulk sequences of operations to verify the engine stays
//! solvent and internally consistent well past the handful of operations
//! the unit tests exercise.

use lmsr_core::decimal::{Amount, Credit, DEFAULT_MARKET_DP};
use lmsr_core::engine::{Engine, EngineConfig};
use lmsr_core::invariants::InvariantChecker;
use lmsr_core::types::Timestamp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod long_sequence_tests {
    use super::*;

    /// 10,000 small alternating buys across a handful of traders and
    /// outcomes, checking full invariants periodically rather than after
    /// every single trade (that's already covered by `EngineConfig::check_invariants`
    /// when left on; this test runs with it off and spot-checks instead, the
    /// way a caller doing a bulk import might).
    #[test]
    fn ten_thousand_trades_hold_every_checkable_invariant() {
        let mut engine = Engine::new(EngineConfig::production());

        let num_traders = 8;
        let mut traders = Vec::new();
        for _ in 0..num_traders {
            let id = engine.open_account();
            engine.mint(id, Credit::new(dec!(1_000_000)).unwrap()).unwrap();
            traders.push(id);
        }

        let market_id = engine
            .create_market(
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                dec!(500),
                DEFAULT_MARKET_DP,
                Timestamp::from_millis(1_000_000_000),
            )
            .unwrap();

        let checker = InvariantChecker;
        for i in 0..10_000u64 {
            let trader = traders[(i as usize) % traders.len()];
            let outcome = (i as usize) % 4;
            let delta = Amount::new(Decimal::new(((i % 37) + 1) as i64, 2), DEFAULT_MARKET_DP).unwrap();
            let budget = Credit::new(dec!(2000)).unwrap();

            if i % 5 == 0 {
                let held = engine.get_market(market_id).unwrap().position_of(trader, outcome);
                if held.value() >= delta.value() {
                    let _ = engine.sell(trader, market_id, outcome, delta);
                    continue;
                }
            }
            let _ = engine.buy(trader, market_id, outcome, delta, budget);

            if i % 500 == 0 {
                let snap = engine.snapshot();
                checker.check_all(&snap.risk, &snap.ledger, &snap.markets).expect("invariants hold mid-run");
            }
        }

        let snap = engine.snapshot();
        checker.check_all(&snap.risk, &snap.ledger, &snap.markets).expect("invariants hold after 10k trades");
    }

    /// Adding liquidity in 100 small steps then removing it back down in
    /// 100 steps must leave `b` and prices exactly where they started.
    #[test]
    fn many_small_liquidity_changes_round_trip_b() {
        let mut engine = Engine::new(EngineConfig::default());
        let lp = engine.open_account();
        engine.mint(lp, Credit::new(dec!(100_000)).unwrap()).unwrap();
        let market_id = engine
            .create_market(vec!["yes".into(), "no".into()], dec!(100), DEFAULT_MARKET_DP, Timestamp::from_millis(0))
            .unwrap();

        for _ in 0..100 {
            engine.add_liquidity(market_id, dec!(1)).unwrap();
        }
        assert_eq!(engine.get_market(market_id).unwrap().b, dec!(200));

        for _ in 0..100 {
            engine.remove_liquidity(market_id, dec!(1)).unwrap();
        }
        assert_eq!(engine.get_market(market_id).unwrap().b, dec!(100));
    }

    /// Many markets ticking past their deadline in one `tick()` call are
    /// all voided, and only those markets.
    #[test]
    fn tick_voids_every_expired_market_and_none_still_open() {
        let mut engine = Engine::new(EngineConfig::default());
        let trader = engine.open_account();
        engine.mint(trader, Credit::new(dec!(50_000)).unwrap()).unwrap();

        let mut expiring = Vec::new();
        for i in 0..20 {
            let id = engine
                .create_market(vec!["yes".into(), "no".into()], dec!(20), DEFAULT_MARKET_DP, Timestamp::from_millis(1000 + i))
                .unwrap();
            expiring.push(id);
        }
        let still_open = engine
            .create_market(vec!["yes".into(), "no".into()], dec!(20), DEFAULT_MARKET_DP, Timestamp::from_millis(10_000))
            .unwrap();

        let result = engine.tick(Timestamp::from_millis(5000)).unwrap();

        assert_eq!(result.voided_markets.len(), 20);
        for id in expiring {
            assert_eq!(engine.get_market(id).unwrap().status, lmsr_core::MarketStatus::Void);
        }
        assert_eq!(engine.get_market(still_open).unwrap().status, lmsr_core::MarketStatus::Open);
    }
}
