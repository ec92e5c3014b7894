//! Risk guard configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static risk bounds, loaded once at startup and immutable for the
/// life of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Symbols the executor may trade.
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,
    /// Smallest notional a trade may carry (USD).
    #[serde(default = "default_min_notional")]
    pub min_notional: Decimal,
    /// Largest notional a trade may carry (USD).
    #[serde(default = "default_max_notional")]
    pub max_notional: Decimal,
    /// Minimum edge in basis points required to open.
    #[serde(default = "default_min_edge_bps")]
    pub min_edge_bps: Decimal,
    /// Maximum leverage the executor may request.
    #[serde(default = "default_max_leverage")]
    pub max_leverage: u32,
    /// Maximum concurrent open positions. The single-position design
    /// keeps this at 1.
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
}

fn default_whitelist() -> Vec<String> {
    vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]
}

fn default_min_notional() -> Decimal {
    Decimal::from(100)
}

fn default_max_notional() -> Decimal {
    Decimal::from(10_000)
}

fn default_min_edge_bps() -> Decimal {
    Decimal::from(1)
}

fn default_max_leverage() -> u32 {
    3
}

fn default_max_positions() -> usize {
    1
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            whitelist: default_whitelist(),
            min_notional: default_min_notional(),
            max_notional: default_max_notional(),
            min_edge_bps: default_min_edge_bps(),
            max_leverage: default_max_leverage(),
            max_positions: default_max_positions(),
        }
    }
}

impl RiskConfig {
    /// Whether a symbol may be traded.
    #[must_use]
    pub fn is_whitelisted(&self, symbol: &str) -> bool {
        self.whitelist.iter().any(|s| s == symbol)
    }
}
