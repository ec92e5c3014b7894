//! Executor configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Static parameters of the execution loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Instrument to trade, e.g. "BTCUSDT".
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Target notional per pair (USD).
    #[serde(default = "default_notional")]
    pub notional: Decimal,
    /// Leverage applied to both legs.
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Minimum edge in basis points for an opportunity to count as
    /// profitable.
    #[serde(default = "default_min_edge_bps")]
    pub min_edge_bps: Decimal,
    /// Taker fee per side, in basis points.
    #[serde(default = "default_fee_bps")]
    pub fee_bps: Decimal,
    /// Assumed slippage per side, in basis points.
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: Decimal,
    /// Seconds between cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Funding is accrued when settlement is at most this close.
    #[serde(default = "default_collect_window_secs")]
    pub collect_window_secs: i64,
    /// The position is unwound when settlement is at most this close.
    /// Must be tighter than the collect window.
    #[serde(default = "default_unwind_window_secs")]
    pub unwind_window_secs: i64,
    /// Bounded mode: stop after this many cycles. `None` runs forever.
    #[serde(default)]
    pub max_cycles: Option<u64>,
    /// Consecutive persistence failures tolerated before shutdown.
    #[serde(default = "default_max_persist_failures")]
    pub max_persist_failures: u32,
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_notional() -> Decimal {
    Decimal::from(1_000)
}

fn default_leverage() -> u32 {
    1
}

fn default_min_edge_bps() -> Decimal {
    Decimal::from(1)
}

fn default_fee_bps() -> Decimal {
    Decimal::from(7)
}

fn default_slippage_bps() -> Decimal {
    Decimal::from(2)
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_collect_window_secs() -> i64 {
    300
}

fn default_unwind_window_secs() -> i64 {
    60
}

fn default_max_persist_failures() -> u32 {
    3
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            notional: default_notional(),
            leverage: default_leverage(),
            min_edge_bps: default_min_edge_bps(),
            fee_bps: default_fee_bps(),
            slippage_bps: default_slippage_bps(),
            poll_interval_secs: default_poll_interval_secs(),
            collect_window_secs: default_collect_window_secs(),
            unwind_window_secs: default_unwind_window_secs(),
            max_cycles: None,
            max_persist_failures: default_max_persist_failures(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.collect_window_secs, 300);
        assert_eq!(config.unwind_window_secs, 60);
        assert!(config.max_cycles.is_none());
        assert!(config.unwind_window_secs < config.collect_window_secs);
    }
}
