//! Opportunity and position model for delta-neutral funding capture.
//!
//! A candidate trade pairs a spot long with a futures short of equal
//! notional. The short perp leg receives funding while the rate is
//! positive; price exposure nets out across the legs, so funding minus
//! costs is the whole edge.
//!
//! Everything here is pure arithmetic over `rust_decimal::Decimal`.

use crate::decimal::{Price, Size};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const BPS_PER_UNIT: Decimal = Decimal::from_parts(10000, 0, 0, false, 0);

/// Funding edge in basis points after costs.
///
/// `edge_bps = funding_rate * 10000 - fee_bps - slippage_bps`.
/// Total function: defined for every input.
#[must_use]
pub fn edge_bps(funding_rate: Decimal, fee_bps: Decimal, slippage_bps: Decimal) -> Decimal {
    funding_rate * BPS_PER_UNIT - fee_bps - slippage_bps
}

/// Whether an edge clears the configured threshold.
///
/// The boundary is inclusive: an opportunity exactly at the threshold
/// is accepted.
#[must_use]
pub fn is_profitable(edge_bps: Decimal, threshold_bps: Decimal) -> bool {
    edge_bps >= threshold_bps
}

/// Size one leg of the pair: `(notional / price) * leverage`.
///
/// # Errors
/// Returns `CoreError::InvalidInput` if `price` is zero or negative.
pub fn size_position(notional: Decimal, price: Price, leverage: u32) -> Result<Size> {
    if !price.is_positive() {
        return Err(CoreError::InvalidInput(format!(
            "cannot size against non-positive price {price}"
        )));
    }
    Ok(Size::new(
        notional / price.inner() * Decimal::from(leverage),
    ))
}

/// A candidate funding trade, recomputed on every poll and discarded
/// after the cycle that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingOpportunity {
    /// Instrument symbol, e.g. "BTCUSDT".
    pub symbol: String,
    /// Raw per-period funding rate (e.g. 0.0001 = 1 bps).
    pub funding_rate: Decimal,
    /// Funding rate expressed in basis points.
    pub funding_bps: Decimal,
    /// Spot price the long leg would pay.
    pub spot_price: Price,
    /// Futures price the short leg would receive.
    pub futures_price: Price,
    /// Requested notional in quote currency.
    pub notional: Decimal,
    /// Edge after fees and slippage, in basis points.
    pub edge_bps: Decimal,
    /// Next funding settlement.
    pub next_funding_at: DateTime<Utc>,
    /// Whether the edge clears the configured threshold.
    pub profitable: bool,
}

impl FundingOpportunity {
    /// Evaluate a candidate trade. Immutable once constructed.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        funding_rate: Decimal,
        spot_price: Price,
        futures_price: Price,
        notional: Decimal,
        fee_bps: Decimal,
        slippage_bps: Decimal,
        threshold_bps: Decimal,
        next_funding_at: DateTime<Utc>,
    ) -> Self {
        let edge = edge_bps(funding_rate, fee_bps, slippage_bps);
        Self {
            symbol: symbol.into(),
            funding_rate,
            funding_bps: funding_rate * BPS_PER_UNIT,
            spot_price,
            futures_price,
            notional,
            edge_bps: edge,
            next_funding_at,
            profitable: is_profitable(edge, threshold_bps),
        }
    }
}

/// An open delta-neutral pair. The only long-lived trading entity.
///
/// Created by a successful open, mutated only by funding accrual while
/// open, finalized by a close. Owned exclusively by the execution loop;
/// the state store just (de)serializes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol.
    pub symbol: String,
    /// Spot leg quantity (long).
    pub spot_size: Size,
    /// Futures leg quantity (short).
    pub futures_size: Size,
    /// Spot entry price.
    pub spot_entry_price: Price,
    /// Futures entry price.
    pub futures_entry_price: Price,
    /// Notional at entry, in quote currency.
    pub entry_notional: Decimal,
    /// When the pair was opened.
    pub opened_at: DateTime<Utc>,
    /// Funding collected so far. Monotonically non-decreasing while the
    /// funding rate stays positive.
    pub funding_collected: Decimal,
    /// Realized P&L, set exactly once at close.
    pub realized_pnl: Option<Decimal>,
}

impl Position {
    /// Create a freshly opened pair.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        spot_size: Size,
        futures_size: Size,
        spot_entry_price: Price,
        futures_entry_price: Price,
        entry_notional: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            spot_size,
            futures_size,
            spot_entry_price,
            futures_entry_price,
            entry_notional,
            opened_at,
            funding_collected: Decimal::ZERO,
            realized_pnl: None,
        }
    }

    /// Accrue one funding payment: `futures_size * mark_price * rate`.
    ///
    /// The payment is added to `funding_collected` and returned. Its
    /// sign follows the funding rate: a positive rate pays the short
    /// futures leg, a negative rate charges it.
    pub fn accrue_funding(&mut self, mark_price: Price, funding_rate: Decimal) -> Decimal {
        let payment = self.futures_size.inner() * mark_price.inner() * funding_rate;
        self.funding_collected += payment;
        payment
    }

    /// Realized P&L if both legs were closed at the given exit prices.
    ///
    /// `spot_pnl = (exit_spot - entry_spot) * spot_size` and
    /// `futures_pnl = -(exit_futures - entry_futures) * futures_size`
    /// (short leg: a price increase is a loss). Funding collected is
    /// part of the realized result.
    #[must_use]
    pub fn close_pnl(&self, exit_spot: Price, exit_futures: Price) -> Decimal {
        let spot_pnl = (exit_spot - self.spot_entry_price).inner() * self.spot_size.inner();
        let futures_pnl =
            -(exit_futures - self.futures_entry_price).inner() * self.futures_size.inner();
        spot_pnl + futures_pnl + self.funding_collected
    }

    /// How long the pair has been open as of `now`.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.opened_at
    }
}

/// Pre-trade projection of one or more funding windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowPnl {
    /// Gross funding income over the projected periods.
    pub funding_income: Decimal,
    /// Round-trip trading fees (entry + exit).
    pub fees: Decimal,
    /// Round-trip slippage cost (entry + exit).
    pub slippage: Decimal,
    /// Net P&L after costs.
    pub net_pnl: Decimal,
    /// Net P&L in basis points of notional.
    pub net_pnl_bps: Decimal,
}

/// Project the P&L of holding a pair across `periods` funding windows.
///
/// Fees and slippage are charged on both entry and exit, hence the
/// factor of two.
#[must_use]
pub fn project_window_pnl(
    notional: Decimal,
    funding_rate: Decimal,
    fee_bps: Decimal,
    slippage_bps: Decimal,
    periods: u32,
) -> WindowPnl {
    let funding_income = notional * funding_rate * Decimal::from(periods);
    let fees = notional * (fee_bps / BPS_PER_UNIT) * Decimal::TWO;
    let slippage = notional * (slippage_bps / BPS_PER_UNIT) * Decimal::TWO;
    let net_pnl = funding_income - fees - slippage;
    let net_pnl_bps = if notional.is_zero() {
        Decimal::ZERO
    } else {
        net_pnl / notional * BPS_PER_UNIT
    };

    WindowPnl {
        funding_income,
        fees,
        slippage,
        net_pnl,
        net_pnl_bps,
    }
}
