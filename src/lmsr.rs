// 3.0: pure LMSR math. no state, no ids, no accounts — just the cost function,
// the price vector, and cost-of-trade, all worked in exact `Decimal` and left
// unquantized. Quantization direction is a market-engine concern (§4.1/§4.2),
// not this module's; callers decide how to round what comes out of here.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LmsrError {
    #[error("liquidity parameter b must be strictly positive, got {0}")]
    NonPositiveB(Decimal),
    #[error("q vector must have at least one outcome")]
    EmptyOutcomes,
    #[error("arithmetic overflow evaluating LMSR cost function")]
    Overflow,
}

/// `C(q) = b * ln(sum_i exp(q_i / b))`, normalized by subtracting
/// `max(q_i / b)` before exponentiating so large `q` never overflows `exp`.
pub fn cost(q: &[Decimal], b: Decimal) -> Result<Decimal, LmsrError> {
    if b <= Decimal::ZERO {
        return Err(LmsrError::NonPositiveB(b));
    }
    if q.is_empty() {
        return Err(LmsrError::EmptyOutcomes);
    }

    let scaled: Vec<Decimal> = q.iter().map(|qi| qi / b).collect();
    let max_scaled = scaled
        .iter()
        .copied()
        .fold(scaled[0], |a, b| if b > a { b } else { a });

    let mut sum_exp = Decimal::ZERO;
    for s in &scaled {
        let shifted = *s - max_scaled;
        sum_exp += shifted.exp();
    }

    let ln_sum = sum_exp.ln();
    Ok(b * (max_scaled + ln_sum))
}

/// `price_i(q) = exp(q_i/b) / sum_j exp(q_j/b)`. Returned unrounded; the
/// caller quantizes at market precision and redistributes residual ULPs so
/// the vector sums to exactly 1 (see [`normalize_prices`]).
pub fn prices(q: &[Decimal], b: Decimal) -> Result<Vec<Decimal>, LmsrError> {
    if b <= Decimal::ZERO {
        return Err(LmsrError::NonPositiveB(b));
    }
    if q.is_empty() {
        return Err(LmsrError::EmptyOutcomes);
    }

    let scaled: Vec<Decimal> = q.iter().map(|qi| qi / b).collect();
    let max_scaled = scaled
        .iter()
        .copied()
        .fold(scaled[0], |a, b| if b > a { b } else { a });

    let exp_shifted: Vec<Decimal> = scaled.iter().map(|s| (*s - max_scaled).exp()).collect();
    let sum_exp: Decimal = exp_shifted.iter().sum();

    Ok(exp_shifted.iter().map(|e| e / sum_exp).collect())
}

/// `cost_of_trade(q, delta) = C(q + delta) - C(q)`, `delta` applied only to
/// `outcome`. Positive `delta_amount` is a buy, negative is a sell.
pub fn cost_of_trade(
    q: &[Decimal],
    b: Decimal,
    outcome: usize,
    delta_amount: Decimal,
) -> Result<Decimal, LmsrError> {
    if outcome >= q.len() {
        return Err(LmsrError::EmptyOutcomes);
    }
    let before = cost(q, b)?;
    let mut after_q = q.to_vec();
    after_q[outcome] += delta_amount;
    let after = cost(&after_q, b)?;
    Ok(after - before)
}

/// The AMM's worst-case subsidy requirement for `n` outcomes: `b * ln(n)`.
pub fn worst_case_subsidy(b: Decimal, n_outcomes: usize) -> Result<Decimal, LmsrError> {
    if b <= Decimal::ZERO {
        return Err(LmsrError::NonPositiveB(b));
    }
    if n_outcomes == 0 {
        return Err(LmsrError::EmptyOutcomes);
    }
    let n = Decimal::from(n_outcomes as u64);
    Ok(b * n.ln())
}

/// Rounds a price vector at `market_dp` and fixes the sum to exactly 1 by
/// nudging the largest component, as required by §4.2 ("prices must sum to
/// exactly 1 after rounding"; residual ULPs go to the largest component).
pub fn normalize_prices(raw: &[Decimal], market_dp: u32) -> Vec<Decimal> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut rounded: Vec<Decimal> = raw
        .iter()
        .map(|p| p.round_dp_with_strategy(market_dp, rust_decimal::RoundingStrategy::MidpointNearestEven))
        .collect();

    let unit_scale = Decimal::new(1, market_dp);
    let target = Decimal::ONE;
    let sum: Decimal = rounded.iter().sum();
    let mut residual = target - sum;

    if residual != Decimal::ZERO {
        let (largest_idx, _) = rounded
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .expect("raw is non-empty");

        let steps = (residual / unit_scale)
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::ToZero)
            .to_i64()
            .unwrap_or(0);
        rounded[largest_idx] += unit_scale * Decimal::from(steps);
        residual -= unit_scale * Decimal::from(steps);
        if residual != Decimal::ZERO {
            rounded[largest_idx] += residual;
        }
    }

    rounded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn cost_zero_q_equals_b_ln_n() {
        let b = dec!(100);
        let c = cost(&q(&[0, 0]), b).unwrap();
        let expected = b * dec!(2).ln();
        assert!((c - expected).abs() < dec!(0.0001));
    }

    #[test]
    fn prices_sum_to_one_unrounded() {
        let p = prices(&q(&[5, 3, 1]), dec!(10)).unwrap();
        let sum: Decimal = p.iter().sum();
        assert!((sum - Decimal::ONE).abs() < dec!(0.000001));
    }

    #[test]
    fn symmetric_q_gives_equal_prices() {
        let p = prices(&q(&[7, 7]), dec!(10)).unwrap();
        assert!((p[0] - p[1]).abs() < dec!(0.0000001));
    }

    #[test]
    fn rejects_non_positive_b() {
        assert!(cost(&q(&[0]), dec!(0)).is_err());
        assert!(cost(&q(&[0]), dec!(-1)).is_err());
    }

    #[test]
    fn cost_of_trade_matches_difference() {
        let qv = q(&[2, 1]);
        let b = dec!(10);
        let delta = dec!(3);
        let direct = cost_of_trade(&qv, b, 0, delta).unwrap();
        let mut after = qv.clone();
        after[0] += delta;
        let expected = cost(&after, b).unwrap() - cost(&qv, b).unwrap();
        assert_eq!(direct, expected);
    }

    #[test]
    fn worst_case_subsidy_matches_b_ln_n() {
        let b = dec!(10);
        let w = worst_case_subsidy(b, 2).unwrap();
        assert!((w - b * dec!(2).ln()).abs() < dec!(0.0001));
    }

    #[test]
    fn normalize_prices_sums_to_exactly_one() {
        let raw = vec![dec!(0.3333333), dec!(0.3333333), dec!(0.3333334)];
        let normalized = normalize_prices(&raw, 4);
        let sum: Decimal = normalized.iter().sum();
        assert_eq!(sum, Decimal::ONE);
    }

    #[test]
    fn large_q_does_not_overflow() {
        // without max-subtraction normalization this would overflow exp().
        let result = cost(&q(&[500_000, 0]), dec!(10));
        assert!(result.is_ok());
    }
}
