//! Application assembly.
//!
//! Builds the executor from configuration: paper runs get the built-in
//! synthetic market, live runs must inject a real exchange integration
//! through [`Application::with_exchange`].

use std::sync::Arc;

use carry_core::Price;
use carry_exchange::{
    DynExchangeClient, FundingInfo, MarketKind, PaperExchange, RetryPolicy, RetryingClient, Ticker,
};
use carry_executor::{Executor, KillSwitch, SystemClock};
use carry_notify::{DynNotificationSink, LogSink, WebhookSink};
use carry_risk::RiskGuard;
use carry_state::{StateStore, TradeJournal};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// The assembled application.
pub struct Application {
    config: AppConfig,
    exchange: DynExchangeClient,
    dry_run: bool,
}

impl Application {
    /// Assemble a paper-mode application backed by the synthetic
    /// market.
    ///
    /// # Errors
    /// Refuses a confirmed live configuration: live execution needs a
    /// real exchange integration via [`Application::with_exchange`].
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let dry_run = config.effective_dry_run();
        if !dry_run {
            return Err(AppError::Config(
                "live mode requires an exchange integration; \
                 construct the application with Application::with_exchange"
                    .to_string(),
            ));
        }

        let exchange = build_paper_exchange(&config);
        Ok(Self {
            config,
            exchange,
            dry_run: true,
        })
    }

    /// Assemble with an injected exchange client (live integrations and
    /// custom backends).
    pub fn with_exchange(config: AppConfig, exchange: DynExchangeClient) -> Self {
        let dry_run = config.effective_dry_run();
        Self {
            config,
            exchange,
            dry_run,
        }
    }

    /// Run the executor until it shuts down.
    pub async fn run(self) -> AppResult<()> {
        let sink: DynNotificationSink = match &self.config.webhook_url {
            Some(url) => {
                info!(url = %url, "webhook notifications enabled");
                Arc::new(WebhookSink::new(url.clone()))
            }
            None => Arc::new(LogSink),
        };

        let guard = RiskGuard::new(self.config.risk.clone());
        let store = StateStore::new(&self.config.state.snapshot_path);
        let journal = TradeJournal::new(
            &self.config.state.journal_dir,
            self.config.state.journal_buffer,
        );
        let kill_switch = KillSwitch::new(&self.config.kill_switch_path);

        let mut executor = Executor::new(
            self.config.executor.clone(),
            self.exchange,
            sink,
            guard,
            store,
            Arc::new(SystemClock),
            kill_switch,
        )
        .with_journal(journal)
        .with_dry_run(self.dry_run);

        executor.run().await?;
        Ok(())
    }
}

/// Seed the deterministic paper market from configuration and wrap it
/// in the retrying client, same as a live integration would be.
fn build_paper_exchange(config: &AppConfig) -> DynExchangeClient {
    let paper = PaperExchange::new();
    let symbol = &config.executor.symbol;
    let reference = config.paper.reference_price;
    let half_spread = reference * config.paper.half_spread_bps / Decimal::from(10_000);

    // Spot trades at the reference, the perp a touch above it.
    paper.set_quote(
        symbol,
        MarketKind::Spot,
        Ticker::new(
            Price::new(reference - half_spread),
            Price::new(reference + half_spread),
            Price::new(reference),
        ),
    );
    let perp_mid = reference + half_spread;
    paper.set_quote(
        symbol,
        MarketKind::Perp,
        Ticker::new(
            Price::new(perp_mid - half_spread),
            Price::new(perp_mid + half_spread),
            Price::new(perp_mid),
        ),
    );
    paper.set_funding(
        symbol,
        FundingInfo {
            rate: config.paper.funding_rate,
            next_funding_at: None,
        },
    );

    info!(
        symbol = %symbol,
        reference = %reference,
        funding_rate = %config.paper.funding_rate,
        "paper market seeded"
    );

    Arc::new(RetryingClient::new(
        Arc::new(paper),
        RetryPolicy::default(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunMode;

    #[test]
    fn test_paper_application_assembles() {
        let config = AppConfig::default();
        assert!(Application::new(config).is_ok());
    }

    #[test]
    fn test_live_without_injection_is_refused() {
        // Even with mode=live in config, the environment gate keeps
        // effective_dry_run true, so assembly succeeds as paper.
        let config = AppConfig {
            mode: RunMode::Live,
            ..AppConfig::default()
        };
        let app = Application::new(config).unwrap();
        assert!(app.dry_run);
    }
}
