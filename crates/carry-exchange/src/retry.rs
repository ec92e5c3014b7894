//! Bounded exponential backoff at the exchange boundary.
//!
//! The execution loop never retries: it either gets a result or skips
//! the cycle. Retrying lives here, wrapped around any inner client.
//! Only transient errors are retried; fatal errors surface immediately.

use std::time::Duration;

use tracing::{debug, warn};

use crate::client::{BoxFuture, DynExchangeClient, ExchangeClient};
use crate::error::{ExchangeError, ExchangeResult};
use crate::types::{FundingInfo, MarketKind, OrderRequest, OrderResult, Ticker};

/// Retry schedule: bounded attempts, exponential backoff, capped delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`,
    /// capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        Duration::from_millis(exp.min(self.max_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// An [`ExchangeClient`] that retries transient failures of an inner
/// client according to a [`RetryPolicy`].
pub struct RetryingClient {
    inner: DynExchangeClient,
    policy: RetryPolicy,
}

impl RetryingClient {
    #[must_use]
    pub fn new(inner: DynExchangeClient, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<'a, T, F>(&'a self, op: &'static str, mut call: F) -> ExchangeResult<T>
    where
        F: FnMut() -> BoxFuture<'a, ExchangeResult<T>> + Send,
    {
        let mut attempt = 0u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    debug!(op, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying after transient error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(op, attempts = attempt + 1, error = %e, "exchange call failed");
                    return Err(e);
                }
            }
        }
    }
}

impl ExchangeClient for RetryingClient {
    fn get_ticker<'a>(
        &'a self,
        symbol: &'a str,
        market: MarketKind,
    ) -> BoxFuture<'a, ExchangeResult<Ticker>> {
        Box::pin(self.run("get_ticker", move || self.inner.get_ticker(symbol, market)))
    }

    fn get_funding<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<FundingInfo>> {
        Box::pin(self.run("get_funding", move || self.inner.get_funding(symbol)))
    }

    fn place_order<'a>(
        &'a self,
        request: &'a OrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<OrderResult>> {
        // The client order id in `request` makes resubmission safe: the
        // venue deduplicates on it.
        Box::pin(self.run("place_order", move || self.inner.place_order(request)))
    }

    fn set_leverage<'a>(
        &'a self,
        symbol: &'a str,
        leverage: u32,
    ) -> BoxFuture<'a, ExchangeResult<bool>> {
        Box::pin(self.run("set_leverage", move || {
            self.inner.set_leverage(symbol, leverage)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::PaperExchange;
    use carry_core::Price;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn quoted_paper() -> Arc<PaperExchange> {
        let paper = Arc::new(PaperExchange::new());
        paper.set_quote(
            "BTCUSDT",
            MarketKind::Spot,
            Ticker::new(
                Price::new(dec!(50000)),
                Price::new(dec!(50001)),
                Price::new(dec!(50000)),
            ),
        );
        paper
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5, 500, 8_000);
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2_000));
        // Capped.
        assert_eq!(policy.delay_for(10), Duration::from_millis(8_000));
    }

    #[test]
    fn test_at_least_one_attempt() {
        let policy = RetryPolicy::new(0, 100, 1_000);
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let paper = quoted_paper();
        // Two injected failures, three allowed attempts: must succeed.
        paper.fail_next(2);

        let client = RetryingClient::new(paper.clone(), RetryPolicy::new(3, 1, 10));
        let ticker = client.get_ticker("BTCUSDT", MarketKind::Spot).await.unwrap();
        assert!(ticker.is_valid());
        assert_eq!(paper.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_the_error() {
        let paper = quoted_paper();
        paper.fail_next(5);

        let client = RetryingClient::new(paper.clone(), RetryPolicy::new(2, 1, 10));
        let result = client.get_ticker("BTCUSDT", MarketKind::Spot).await;
        assert!(result.is_err());
        assert_eq!(paper.calls(), 2);
    }

    #[tokio::test]
    async fn test_fatal_errors_are_not_retried() {
        let paper = Arc::new(PaperExchange::new());
        paper.revoke_auth();

        let client = RetryingClient::new(paper.clone(), RetryPolicy::new(4, 1, 10));
        let result = client.get_funding("BTCUSDT").await;
        match result {
            Err(ExchangeError::Auth(_)) => {}
            other => panic!("expected auth error, got {other:?}"),
        }
        assert_eq!(paper.calls(), 1);
    }
}
