// 7.0 config.rs: crate-wide defaults that are not part of the wire contract.
// precisions (CREDITS_DP, DEFAULT_MARKET_DP) live in decimal.rs because
// they are part of that contract, not configuration. `engine::EngineConfig`
// holds the engine-behavior knobs (invariant checking); this file only
// holds defaults for values a caller can override per market.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::DEFAULT_MARKET_DP;

/// Default parameters for `create_market` when the caller doesn't override
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDefaults {
    /// Default LMSR liquidity parameter for new markets.
    pub b: Decimal,
    /// Default token/outcome precision for new markets.
    pub market_dp: u32,
}

impl Default for MarketDefaults {
    fn default() -> Self {
        Self {
            b: Decimal::new(100, 0),
            market_dp: DEFAULT_MARKET_DP,
        }
    }
}

impl MarketDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.b <= Decimal::ZERO {
            return Err(ConfigError::InvalidMarketDefaults {
                reason: "b must be strictly positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidMarketDefaults { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_market_defaults_are_valid() {
        assert!(MarketDefaults::default().validate().is_ok());
    }

    #[test]
    fn non_positive_b_rejected() {
        let mut defaults = MarketDefaults::default();
        defaults.b = Decimal::ZERO;
        assert!(defaults.validate().is_err());
    }

    #[test]
    fn market_defaults_round_trip_through_json() {
        let defaults = MarketDefaults::default();
        let json = serde_json::to_string(&defaults).unwrap();
        let back: MarketDefaults = serde_json::from_str(&json).unwrap();
        assert_eq!(back.b, defaults.b);
        assert_eq!(back.market_dp, defaults.market_dp);
    }
}
