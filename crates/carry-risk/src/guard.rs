//! Risk guard: ordered pre-trade policy checks.

use carry_core::FundingOpportunity;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::config::RiskConfig;

/// Why a candidate trade was rejected.
///
/// Rejections are expected outcomes, not faults: they are logged at
/// warning level and the loop keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("symbol {0} is not whitelisted")]
    SymbolNotWhitelisted(String),

    #[error("notional {notional} below minimum {min}")]
    NotionalBelowMin { notional: Decimal, min: Decimal },

    #[error("notional {notional} above maximum {max}")]
    NotionalAboveMax { notional: Decimal, max: Decimal },

    #[error("edge {edge_bps} bps below threshold {min_edge_bps} bps")]
    EdgeBelowThreshold {
        edge_bps: Decimal,
        min_edge_bps: Decimal,
    },

    #[error("{open} open position(s) at the limit of {max}")]
    MaxPositionsReached { open: usize, max: usize },
}

/// Stateless-per-call policy evaluator.
///
/// Holds the static [`RiskConfig`] plus the open-position counter. The
/// execution loop must call [`RiskGuard::on_opened`] and
/// [`RiskGuard::on_closed`] exactly once per successful open and close,
/// or the counter drifts and silently blocks or permits trading.
#[derive(Debug)]
pub struct RiskGuard {
    config: RiskConfig,
    open_positions: usize,
}

impl RiskGuard {
    #[must_use]
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            open_positions: 0,
        }
    }

    /// Evaluate a candidate trade.
    ///
    /// Checks run conjunctively in a fixed order with early exit on the
    /// first failure: whitelist, notional bounds, edge threshold,
    /// position cap. Each failure is logged, never thrown.
    pub fn evaluate(&self, opportunity: &FundingOpportunity) -> Result<(), RejectReason> {
        if !self.config.is_whitelisted(&opportunity.symbol) {
            let reason = RejectReason::SymbolNotWhitelisted(opportunity.symbol.clone());
            warn!(symbol = %opportunity.symbol, "risk guard: {reason}");
            return Err(reason);
        }

        if opportunity.notional < self.config.min_notional {
            let reason = RejectReason::NotionalBelowMin {
                notional: opportunity.notional,
                min: self.config.min_notional,
            };
            warn!(symbol = %opportunity.symbol, "risk guard: {reason}");
            return Err(reason);
        }

        if opportunity.notional > self.config.max_notional {
            let reason = RejectReason::NotionalAboveMax {
                notional: opportunity.notional,
                max: self.config.max_notional,
            };
            warn!(symbol = %opportunity.symbol, "risk guard: {reason}");
            return Err(reason);
        }

        if opportunity.edge_bps < self.config.min_edge_bps {
            let reason = RejectReason::EdgeBelowThreshold {
                edge_bps: opportunity.edge_bps,
                min_edge_bps: self.config.min_edge_bps,
            };
            warn!(symbol = %opportunity.symbol, "risk guard: {reason}");
            return Err(reason);
        }

        if self.open_positions >= self.config.max_positions {
            let reason = RejectReason::MaxPositionsReached {
                open: self.open_positions,
                max: self.config.max_positions,
            };
            warn!(symbol = %opportunity.symbol, "risk guard: {reason}");
            return Err(reason);
        }

        Ok(())
    }

    /// Boolean convenience over [`RiskGuard::evaluate`].
    #[must_use]
    pub fn can_open(&self, opportunity: &FundingOpportunity) -> bool {
        self.evaluate(opportunity).is_ok()
    }

    /// Whether a requested leverage is within bounds (1..=max).
    #[must_use]
    pub fn validate_leverage(&self, leverage: u32) -> bool {
        (1..=self.config.max_leverage).contains(&leverage)
    }

    /// Record a successful open.
    pub fn on_opened(&mut self) {
        self.open_positions += 1;
    }

    /// Record a successful close. Saturates at zero; an underflow means
    /// the loop's bookkeeping drifted, which is worth a log line rather
    /// than a wrapped counter.
    pub fn on_closed(&mut self) {
        if self.open_positions == 0 {
            warn!("risk guard: on_closed with no open positions recorded");
            return;
        }
        self.open_positions -= 1;
    }

    /// Currently recorded open positions.
    #[must_use]
    pub fn open_positions(&self) -> usize {
        self.open_positions
    }

    /// The static configuration.
    #[must_use]
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carry_core::Price;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn opportunity(symbol: &str, notional: Decimal, edge_seed_rate: Decimal) -> FundingOpportunity {
        FundingOpportunity::new(
            symbol,
            edge_seed_rate,
            Price::new(dec!(50000)),
            Price::new(dec!(50010)),
            notional,
            dec!(7.0),
            dec!(2.0),
            dec!(1.0),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        )
    }

    /// rate 0.002 -> 20 bps gross, 11 bps after costs. Comfortably above
    /// every default threshold.
    fn rich_opportunity(symbol: &str) -> FundingOpportunity {
        opportunity(symbol, dec!(1000), dec!(0.002))
    }

    #[test]
    fn test_pass_through_all_gates() {
        let guard = RiskGuard::new(RiskConfig::default());
        assert!(guard.evaluate(&rich_opportunity("BTCUSDT")).is_ok());
    }

    #[test]
    fn test_non_whitelisted_symbol_always_rejected() {
        let guard = RiskGuard::new(RiskConfig::default());
        let result = guard.evaluate(&rich_opportunity("DOGEUSDT"));
        assert!(matches!(result, Err(RejectReason::SymbolNotWhitelisted(_))));
    }

    #[test]
    fn test_notional_bounds() {
        let guard = RiskGuard::new(RiskConfig::default());

        let small = opportunity("BTCUSDT", dec!(50), dec!(0.002));
        assert!(matches!(
            guard.evaluate(&small),
            Err(RejectReason::NotionalBelowMin { .. })
        ));

        let large = opportunity("BTCUSDT", dec!(50000), dec!(0.002));
        assert!(matches!(
            guard.evaluate(&large),
            Err(RejectReason::NotionalAboveMax { .. })
        ));
    }

    #[test]
    fn test_edge_threshold() {
        let guard = RiskGuard::new(RiskConfig::default());

        // rate 0.0008 -> 8 bps gross, -1 bps net: below the 1 bps floor.
        let thin = opportunity("BTCUSDT", dec!(1000), dec!(0.0008));
        assert!(matches!(
            guard.evaluate(&thin),
            Err(RejectReason::EdgeBelowThreshold { .. })
        ));
    }

    #[test]
    fn test_max_positions_rejects_even_rich_edge() {
        let mut guard = RiskGuard::new(RiskConfig::default());
        guard.on_opened();

        let result = guard.evaluate(&rich_opportunity("BTCUSDT"));
        assert!(matches!(
            result,
            Err(RejectReason::MaxPositionsReached { open: 1, max: 1 })
        ));
    }

    #[test]
    fn test_counter_lifecycle() {
        let mut guard = RiskGuard::new(RiskConfig::default());
        assert_eq!(guard.open_positions(), 0);

        guard.on_opened();
        assert_eq!(guard.open_positions(), 1);
        assert!(!guard.can_open(&rich_opportunity("BTCUSDT")));

        guard.on_closed();
        assert_eq!(guard.open_positions(), 0);
        assert!(guard.can_open(&rich_opportunity("BTCUSDT")));

        // Saturates instead of wrapping.
        guard.on_closed();
        assert_eq!(guard.open_positions(), 0);
    }

    #[test]
    fn test_leverage_bounds() {
        let guard = RiskGuard::new(RiskConfig::default());
        assert!(guard.validate_leverage(1));
        assert!(guard.validate_leverage(3));
        assert!(!guard.validate_leverage(0));
        assert!(!guard.validate_leverage(4));
    }
}
