//! LMSR prediction-market core — worked simulation
//!
//! Walks a single market through the lifecycle this crate exists to get
//! right: creation, trading, liquidity growth, and both terminal states
//! (resolve on one run, void on another), narrating balances and prices at
//! each step.

use lmsr_core::engine::{Engine, EngineConfig};
use lmsr_core::{Amount, Credit, DEFAULT_MARKET_DP};
use rust_decimal_macros::dec;

fn main() {
    println!("=== LMSR Core - Worked Simulation ===\n");

    simulate_resolved_market();
    println!("\n{}", "=".repeat(60));
    simulate_voided_market();
    println!("\n{}", "=".repeat(60));
    simulate_dust_accrual();
}

fn simulate_resolved_market() {
    println!("Scenario: buy, sell, add liquidity, resolve\n");

    let mut engine = Engine::new(EngineConfig::default());
    let alice = engine.open_account();
    let bob = engine.open_account();
    engine.mint(alice, Credit::new(dec!(10000)).unwrap()).unwrap();
    engine.mint(bob, Credit::new(dec!(10000)).unwrap()).unwrap();

    let market = engine
        .create_market(
            vec!["yes".into(), "no".into()],
            dec!(100),
            DEFAULT_MARKET_DP,
            lmsr_core::Timestamp::from_millis(1_000_000),
        )
        .unwrap();
    println!("Created market {} with b=100, subsidy locked from a fresh AMM account", market.0);

    let delta = Amount::new(dec!(25), DEFAULT_MARKET_DP).unwrap();
    let trade = engine.buy(alice, market, 0, delta, Credit::new(dec!(5000)).unwrap()).unwrap();
    println!("Alice buys 25 yes at price {}, cost ~{}", trade.price, trade.amount);

    let no_delta = Amount::new(dec!(15), DEFAULT_MARKET_DP).unwrap();
    engine.buy(bob, market, 1, no_delta, Credit::new(dec!(5000)).unwrap()).unwrap();
    println!("Bob buys 15 no");

    let prices = engine.prices(market).unwrap();
    println!("Prices now: yes={} no={}", prices[0], prices[1]);

    engine.add_liquidity(market, dec!(50)).unwrap();
    println!("Liquidity grows by 50 (b=150); prices unchanged: {:?}", engine.prices(market).unwrap());

    let sell_delta = Amount::new(dec!(10), DEFAULT_MARKET_DP).unwrap();
    engine.sell(alice, market, 0, sell_delta).unwrap();
    println!("Alice sells 10 of her yes position back");

    engine.resolve(market, 0).unwrap();
    println!("Market resolves yes. Alice's remaining yes tokens pay out 1:1 from the AMM's subsidy.");
    println!(
        "Final totals: alice={}, bob={}",
        engine_account_total(&engine, alice),
        engine_account_total(&engine, bob),
    );
}

fn simulate_voided_market() {
    println!("Scenario: buy then void, everyone returns to their starting total\n");

    let mut engine = Engine::new(EngineConfig::default());
    let trader = engine.open_account();
    engine.mint(trader, Credit::new(dec!(5000)).unwrap()).unwrap();
    let before = engine_account_total(&engine, trader);

    let market = engine
        .create_market(
            vec!["a".into(), "b".into(), "c".into()],
            dec!(50),
            DEFAULT_MARKET_DP,
            lmsr_core::Timestamp::from_millis(1_000_000),
        )
        .unwrap();
    let delta = Amount::new(dec!(5), DEFAULT_MARKET_DP).unwrap();
    engine.buy(trader, market, 2, delta, Credit::new(dec!(1000)).unwrap()).unwrap();

    engine.void(market).unwrap();
    let after = engine_account_total(&engine, trader);
    println!("Trader total before trading: {before}, after void: {after} (equal: {})", before == after);
}

fn simulate_dust_accrual() {
    println!("Scenario: S2 — buying in one shot vs. ten small buys\n");

    let mut one_shot = Engine::new(EngineConfig::default());
    let a = one_shot.open_account();
    one_shot.mint(a, Credit::new(dec!(10000)).unwrap()).unwrap();
    let market = one_shot
        .create_market(vec!["yes".into(), "no".into()], dec!(100), DEFAULT_MARKET_DP, lmsr_core::Timestamp::from_millis(0))
        .unwrap();
    let ten = Amount::new(dec!(10), DEFAULT_MARKET_DP).unwrap();
    let trade = one_shot.buy(a, market, 0, ten, Credit::new(dec!(5000)).unwrap()).unwrap();
    let c1 = trade_cost(&trade);

    let mut piecewise = Engine::new(EngineConfig::default());
    let b = piecewise.open_account();
    piecewise.mint(b, Credit::new(dec!(10000)).unwrap()).unwrap();
    let market2 = piecewise
        .create_market(vec!["yes".into(), "no".into()], dec!(100), DEFAULT_MARKET_DP, lmsr_core::Timestamp::from_millis(0))
        .unwrap();
    let one = Amount::new(dec!(1), DEFAULT_MARKET_DP).unwrap();
    let mut c10 = Credit::ZERO;
    for _ in 0..10 {
        let t = piecewise.buy(b, market2, 0, one, Credit::new(dec!(5000)).unwrap()).unwrap();
        c10 = c10.checked_add(trade_cost(&t));
    }

    println!("One-shot cost for 10 yes: {c1}");
    println!("Ten-step cost for 10 yes: {c10} (dust accrues to the AMM as c10 - c1 = {})", c10.checked_sub(c1).unwrap_or(Credit::ZERO));
}

fn engine_account_total(engine: &Engine, account: lmsr_core::AccountId) -> Credit {
    engine.snapshot().risk.account(account).unwrap().total()
}

/// The credit cost a buyer paid for a trade, recovered from its signed leg.
fn trade_cost(trade: &lmsr_core::Trade) -> Credit {
    trade
        .buyer
        .as_ref()
        .and_then(|leg| Credit::new(-leg.available_delta.value()).ok())
        .unwrap_or(Credit::ZERO)
}
