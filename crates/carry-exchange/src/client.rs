//! Exchange client trait.
//!
//! Trait-based abstraction over the venue so the executor can be wired
//! to a live integration, the retry wrapper, or the paper backend
//! without code changes. Dyn-compatible via boxed futures.

use std::pin::Pin;
use std::sync::Arc;

use crate::error::ExchangeResult;
use crate::types::{FundingInfo, MarketKind, OrderRequest, OrderResult, Ticker};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// The exchange operations the executor consumes.
///
/// Call timeouts and order idempotency across retries are the
/// implementation's responsibility; the executor assumes any returned
/// error left no partial state behind.
pub trait ExchangeClient: Send + Sync {
    /// Top-of-book quote for one instrument on one book.
    fn get_ticker<'a>(
        &'a self,
        symbol: &'a str,
        market: MarketKind,
    ) -> BoxFuture<'a, ExchangeResult<Ticker>>;

    /// Current funding rate and, when known, the next settlement time.
    fn get_funding<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<FundingInfo>>;

    /// Place an order and wait for its terminal status.
    fn place_order<'a>(
        &'a self,
        request: &'a OrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<OrderResult>>;

    /// Set leverage on the perp book. Returns whether the venue applied it.
    fn set_leverage<'a>(
        &'a self,
        symbol: &'a str,
        leverage: u32,
    ) -> BoxFuture<'a, ExchangeResult<bool>>;
}

/// Shared trait object alias used throughout the executor.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;
