//! Exchange client boundary for the carry executor.
//!
//! The executor never talks to an exchange directly: it depends on the
//! dyn-compatible [`ExchangeClient`] trait. This crate provides:
//! - the trait and its wire types (tickers, funding info, orders)
//! - the transient-vs-fatal error taxonomy
//! - [`RetryingClient`], bounded exponential backoff at the client
//!   boundary
//! - [`PaperExchange`], a deterministic in-memory backend for dry-run
//!   mode and tests

pub mod client;
pub mod error;
pub mod paper;
pub mod retry;
pub mod types;

pub use client::{BoxFuture, DynExchangeClient, ExchangeClient};
pub use error::{ExchangeError, ExchangeResult};
pub use paper::PaperExchange;
pub use retry::{RetryPolicy, RetryingClient};
pub use types::{
    ClientOrderId, FundingInfo, MarketKind, OrderRequest, OrderResult, OrderSide, OrderStatus,
    OrderType, Ticker,
};
