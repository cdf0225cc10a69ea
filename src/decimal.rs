// 2.0: fixed-point decimal contract. two precisions live in this crate:
// CREDITS_DP for anything that touches an Account/Lock/Transaction, MARKET_DP
// (per-market, defaults to DEFAULT_MARKET_DP) for q/positions/trade amounts.
// every quantization call below names its rounding direction; there is no
// "just round" helper, because the direction is part of the external contract.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use thiserror::Error;

pub const CREDITS_DP: u32 = 6;
pub const DEFAULT_MARKET_DP: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidPrecision {
    #[error("value {value} has more than {max_dp} fractional digits")]
    TooManyFractionalDigits { value: Decimal, max_dp: u32 },
    #[error("value {0} must be non-negative")]
    Negative(Decimal),
    #[error("value {0} must be strictly positive")]
    NotPositive(Decimal),
}

/// Which way a quantization rounds. Fixed by the contract, not a caller choice:
/// prices round half-even, tokens/credits a trader *receives* round floor,
/// credits a trader *pays* round ceil. All three favor the AMM on ties only
/// in the floor/ceil cases; half-even favors no one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    HalfEven,
    Floor,
    Ceil,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
            Rounding::Floor => RoundingStrategy::ToNegativeInfinity,
            Rounding::Ceil => RoundingStrategy::ToPositiveInfinity,
        }
    }
}

fn quantize(value: Decimal, dp: u32, rounding: Rounding) -> Decimal {
    value.round_dp_with_strategy(dp, rounding.strategy())
}

fn has_excess_precision(value: Decimal, dp: u32) -> bool {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero) != value
}

/// A credit amount, always quantized to [`CREDITS_DP`] and always
/// non-negative at rest (signed deltas in transactions use plain `Decimal`,
/// see [`ledger::Transaction`](crate::ledger::Transaction)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Credit(Decimal);

impl Credit {
    pub const ZERO: Credit = Credit(Decimal::ZERO);

    /// Accepts a value already at or under `CREDITS_DP`; rejects excess
    /// precision and negative amounts at the API boundary, per §4.1.
    pub fn new(value: Decimal) -> Result<Self, InvalidPrecision> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(InvalidPrecision::Negative(value));
        }
        if has_excess_precision(value, CREDITS_DP) {
            return Err(InvalidPrecision::TooManyFractionalDigits {
                value,
                max_dp: CREDITS_DP,
            });
        }
        Ok(Credit(value))
    }

    /// Quantizes an exact (possibly over-precise) result into a `Credit`,
    /// rounding in the caller-specified direction. Used for cost-of-trade
    /// outputs, which are exact LMSR math results before quantization.
    pub fn quantize(value: Decimal, rounding: Rounding) -> Self {
        Credit(quantize(value, CREDITS_DP, rounding))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Credit) -> Credit {
        Credit(self.0 + other.0)
    }

    pub fn checked_sub(self, other: Credit) -> Result<Credit, InvalidPrecision> {
        let diff = self.0 - other.0;
        Credit::new(diff)
    }

    pub fn min(self, other: Credit) -> Credit {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Credit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Sum for Credit {
    fn sum<I: Iterator<Item = Credit>>(iter: I) -> Self {
        iter.fold(Credit::ZERO, Credit::checked_add)
    }
}

/// A signed credit delta, as recorded on transactions and trade legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignedCredit(Decimal);

impl SignedCredit {
    pub fn new(value: Decimal) -> Result<Self, InvalidPrecision> {
        if has_excess_precision(value, CREDITS_DP) {
            return Err(InvalidPrecision::TooManyFractionalDigits {
                value,
                max_dp: CREDITS_DP,
            });
        }
        Ok(SignedCredit(value))
    }

    pub fn from_credit(credit: Credit, negative: bool) -> Self {
        SignedCredit(if negative { -credit.0 } else { credit.0 })
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for SignedCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Neg for SignedCredit {
    type Output = SignedCredit;
    fn neg(self) -> SignedCredit {
        SignedCredit(-self.0)
    }
}

/// A token amount (q/position/trade size), quantized to a market's own
/// precision (`MARKET_DP`, default [`DEFAULT_MARKET_DP`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal, market_dp: u32) -> Result<Self, InvalidPrecision> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(InvalidPrecision::Negative(value));
        }
        if has_excess_precision(value, market_dp) {
            return Err(InvalidPrecision::TooManyFractionalDigits {
                value,
                max_dp: market_dp,
            });
        }
        Ok(Amount(value))
    }

    pub fn positive(value: Decimal, market_dp: u32) -> Result<Self, InvalidPrecision> {
        let amount = Amount::new(value, market_dp)?;
        if amount.is_zero() {
            return Err(InvalidPrecision::NotPositive(value));
        }
        Ok(amount)
    }

    pub fn quantize(value: Decimal, market_dp: u32, rounding: Rounding) -> Self {
        Amount(quantize(value, market_dp, rounding))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}
