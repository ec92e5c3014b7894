//! Wire types for the exchange client boundary.

use carry_core::{Price, Size};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which venue a request targets: the spot book or the perpetual book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Spot,
    Perp,
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spot => write!(f, "spot"),
            Self::Perp => write!(f, "perp"),
        }
    }
}

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Market order. The executor's default: both legs must fill now.
    Market,
    /// Limit order.
    Limit,
}

/// Client order ID for idempotency.
///
/// Every order carries a unique id so a retried placement can be
/// recognized by the exchange instead of filling twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `carry_{timestamp_ms}_{uuid_short}`
    #[must_use]
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("carry_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for parsing responses).
    #[must_use]
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Top-of-book quote for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    /// Best bid.
    pub bid: Price,
    /// Best ask.
    pub ask: Price,
    /// Last traded price.
    pub last: Price,
}

impl Ticker {
    #[must_use]
    pub fn new(bid: Price, ask: Price, last: Price) -> Self {
        Self { bid, ask, last }
    }

    /// Quote is usable when both sides are positive and not crossed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.bid.is_positive() && self.ask.is_positive() && self.bid < self.ask
    }
}

/// Funding rate snapshot for a perpetual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingInfo {
    /// Current per-period funding rate (e.g. 0.0001 = 1 bps).
    pub rate: Decimal,
    /// Next settlement, when the exchange reports it.
    pub next_funding_at: Option<DateTime<Utc>>,
}

/// An order to be placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client order id for retry idempotency.
    pub client_id: ClientOrderId,
    /// Instrument symbol.
    pub symbol: String,
    /// Spot or perp book.
    pub market: MarketKind,
    /// Buy or sell.
    pub side: OrderSide,
    /// Quantity in base units.
    pub size: Size,
    /// Limit price. `None` for market orders.
    pub price: Option<Price>,
    /// Market or limit.
    pub order_type: OrderType,
    /// Whether the order may only reduce an existing position.
    pub reduce_only: bool,
}

impl OrderRequest {
    /// A market order on the given book.
    #[must_use]
    pub fn market(symbol: impl Into<String>, market: MarketKind, side: OrderSide, size: Size) -> Self {
        Self {
            client_id: ClientOrderId::new(),
            symbol: symbol.into(),
            market,
            side,
            size,
            price: None,
            order_type: OrderType::Market,
            reduce_only: false,
        }
    }

    /// Mark the order reduce-only.
    #[must_use]
    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }
}

/// Terminal status of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Fully filled.
    Filled,
    /// Rejected by the exchange.
    Rejected,
}

/// Result of an order placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Exchange-assigned order id.
    pub order_id: String,
    /// Echoed client order id.
    pub client_id: ClientOrderId,
    /// Terminal status.
    pub status: OrderStatus,
    /// Filled quantity.
    pub filled_size: Size,
    /// Average fill price.
    pub avg_price: Price,
}

impl OrderResult {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ticker_validity() {
        let good = Ticker::new(
            Price::new(dec!(100)),
            Price::new(dec!(101)),
            Price::new(dec!(100.5)),
        );
        assert!(good.is_valid());

        let crossed = Ticker::new(
            Price::new(dec!(101)),
            Price::new(dec!(100)),
            Price::new(dec!(100.5)),
        );
        assert!(!crossed.is_valid());

        let empty = Ticker::new(Price::ZERO, Price::new(dec!(101)), Price::ZERO);
        assert!(!empty.is_valid());
    }

    #[test]
    fn test_client_order_ids_are_unique() {
        let a = ClientOrderId::new();
        let b = ClientOrderId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("carry_"));
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }
}
