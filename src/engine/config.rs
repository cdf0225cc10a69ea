// 8.0.1: engine config. invariant-check toggle, initial capacity hints.

use crate::config::MarketDefaults;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Gates the full §8 cross-domain invariant sweep after every mutating
    /// public operation. On by default so tests and fuzzers always run it;
    /// a release build that wants to skip the O(accounts + locks) re-check
    /// on the hot path can turn it off via `production()`.
    pub check_invariants: bool,
    pub market_defaults: MarketDefaults,
    /// Initial capacity hint for the accounts map; avoids early reallocation
    /// in workloads that open many accounts up front.
    pub initial_account_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_invariants: true,
            market_defaults: MarketDefaults::default(),
            initial_account_capacity: 16,
        }
    }
}

impl EngineConfig {
    pub fn production() -> Self {
        Self {
            check_invariants: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_checks_invariants() {
        assert!(EngineConfig::default().check_invariants);
    }

    #[test]
    fn production_disables_invariant_checking() {
        assert!(!EngineConfig::production().check_invariants);
    }
}
