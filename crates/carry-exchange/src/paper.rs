//! Paper trading backend.
//!
//! In-memory [`ExchangeClient`] used by dry-run mode and tests. Fills
//! every order instantly at the quoted price, records what it was asked
//! to do, and can inject transient or fatal failures on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::client::{BoxFuture, ExchangeClient};
use crate::error::{ExchangeError, ExchangeResult};
use crate::types::{
    FundingInfo, MarketKind, OrderRequest, OrderResult, OrderSide, OrderStatus, Ticker,
};

/// Deterministic in-memory exchange.
///
/// Quotes and funding are scripted by the caller; there is no clock and
/// no randomness, so tests drive exact scenarios.
#[derive(Default)]
pub struct PaperExchange {
    quotes: Mutex<HashMap<(String, MarketKind), Ticker>>,
    funding: Mutex<HashMap<String, FundingInfo>>,
    orders: Mutex<Vec<OrderRequest>>,
    leverage: Mutex<HashMap<String, u32>>,
    /// Remaining injected transient failures.
    fail_budget: AtomicUsize,
    /// When set, every call fails with an authorization error.
    auth_revoked: AtomicBool,
    /// Total API calls observed.
    calls: AtomicUsize,
}

impl PaperExchange {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the top-of-book for one instrument.
    pub fn set_quote(&self, symbol: &str, market: MarketKind, ticker: Ticker) {
        self.quotes
            .lock()
            .insert((symbol.to_string(), market), ticker);
    }

    /// Script the funding snapshot for one instrument.
    pub fn set_funding(&self, symbol: &str, funding: FundingInfo) {
        self.funding.lock().insert(symbol.to_string(), funding);
    }

    /// Make the next `n` calls fail with a transient transport error.
    pub fn fail_next(&self, n: usize) {
        self.fail_budget.store(n, Ordering::SeqCst);
    }

    /// Make every subsequent call fail with an authorization error.
    pub fn revoke_auth(&self) {
        self.auth_revoked.store(true, Ordering::SeqCst);
    }

    /// Orders placed so far, in submission order.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().clone()
    }

    /// Leverage last applied per symbol.
    #[must_use]
    pub fn leverage(&self, symbol: &str) -> Option<u32> {
        self.leverage.lock().get(symbol).copied()
    }

    /// Total API calls observed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> ExchangeResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.auth_revoked.load(Ordering::SeqCst) {
            return Err(ExchangeError::Auth("credentials revoked".to_string()));
        }

        let mut budget = self.fail_budget.load(Ordering::SeqCst);
        while budget > 0 {
            match self.fail_budget.compare_exchange(
                budget,
                budget - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Err(ExchangeError::Transport("injected failure".to_string())),
                Err(current) => budget = current,
            }
        }

        Ok(())
    }
}

impl ExchangeClient for PaperExchange {
    fn get_ticker<'a>(
        &'a self,
        symbol: &'a str,
        market: MarketKind,
    ) -> BoxFuture<'a, ExchangeResult<Ticker>> {
        Box::pin(async move {
            self.gate()?;
            self.quotes
                .lock()
                .get(&(symbol.to_string(), market))
                .cloned()
                .ok_or_else(|| ExchangeError::Delisted(symbol.to_string()))
        })
    }

    fn get_funding<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, ExchangeResult<FundingInfo>> {
        Box::pin(async move {
            self.gate()?;
            self.funding
                .lock()
                .get(symbol)
                .cloned()
                .ok_or_else(|| ExchangeError::Delisted(symbol.to_string()))
        })
    }

    fn place_order<'a>(
        &'a self,
        request: &'a OrderRequest,
    ) -> BoxFuture<'a, ExchangeResult<OrderResult>> {
        Box::pin(async move {
            self.gate()?;

            let fill_price = match request.price {
                Some(limit) => limit,
                None => {
                    let quotes = self.quotes.lock();
                    let ticker = quotes
                        .get(&(request.symbol.clone(), request.market))
                        .ok_or_else(|| ExchangeError::Delisted(request.symbol.clone()))?;
                    match request.side {
                        OrderSide::Buy => ticker.ask,
                        OrderSide::Sell => ticker.bid,
                    }
                }
            };

            self.orders.lock().push(request.clone());

            debug!(
                symbol = %request.symbol,
                market = %request.market,
                side = %request.side,
                size = %request.size,
                price = %fill_price,
                "paper fill"
            );

            Ok(OrderResult {
                order_id: format!("paper-{}", self.orders.lock().len()),
                client_id: request.client_id.clone(),
                status: OrderStatus::Filled,
                filled_size: request.size,
                avg_price: fill_price,
            })
        })
    }

    fn set_leverage<'a>(
        &'a self,
        symbol: &'a str,
        leverage: u32,
    ) -> BoxFuture<'a, ExchangeResult<bool>> {
        Box::pin(async move {
            self.gate()?;
            self.leverage.lock().insert(symbol.to_string(), leverage);
            Ok(true)
        })
    }
}
