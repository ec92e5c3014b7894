//! The execution loop.
//!
//! Per-cycle algorithm:
//! 1. kill-switch check (cycle boundary only)
//! 2. fetch tickers + funding; soft failures skip the cycle
//! 3. position open and settlement within the collect window: accrue
//!    funding, persist
//! 4. position open and settlement within the tighter unwind window:
//!    close, realize P&L
//! 5. no position, profitable edge, guard approval, outside the unwind
//!    window: open the pair
//! 6. otherwise hold
//!
//! Every successful state transition is persisted before the next
//! network call, so a crash between persist and next action
//! reconstructs cleanly from the snapshot.

use std::time::Duration as StdDuration;

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use carry_core::{format_duration, next_funding_at, size_position, FundingOpportunity, Position};
use carry_exchange::{
    DynExchangeClient, ExchangeError, FundingInfo, MarketKind, OrderRequest, OrderSide, Ticker,
};
use carry_notify::DynNotificationSink;
use carry_risk::RiskGuard;
use carry_state::{JournalEvent, JournalRecord, RunState, StateStore, TradeJournal};

use crate::clock::DynClock;
use crate::config::ExecutorConfig;
use crate::error::{ExecutorError, ExecutorResult};
use crate::kill_switch::KillSwitch;
use crate::phase::{CycleOutcome, ExecutorPhase};

/// Everything fetched from the exchange in one cycle.
struct MarketView {
    spot: Ticker,
    perp: Ticker,
    funding: FundingInfo,
    opportunity: FundingOpportunity,
}

/// The orchestrator. Owns the single open [`Position`].
pub struct Executor {
    config: ExecutorConfig,
    exchange: DynExchangeClient,
    sink: DynNotificationSink,
    guard: RiskGuard,
    store: StateStore,
    journal: Option<TradeJournal>,
    clock: DynClock,
    kill_switch: KillSwitch,
    phase: ExecutorPhase,
    position: Option<Position>,
    dry_run: bool,
    persist_failures: u32,
}

impl Executor {
    #[must_use]
    pub fn new(
        config: ExecutorConfig,
        exchange: DynExchangeClient,
        sink: DynNotificationSink,
        guard: RiskGuard,
        store: StateStore,
        clock: DynClock,
        kill_switch: KillSwitch,
    ) -> Self {
        Self {
            config,
            exchange,
            sink,
            guard,
            store,
            journal: None,
            clock,
            kill_switch,
            phase: ExecutorPhase::Idle,
            position: None,
            dry_run: true,
            persist_failures: 0,
        }
    }

    /// Attach a trade journal.
    #[must_use]
    pub fn with_journal(mut self, journal: TradeJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Select paper (true) or live (false) execution. The wired
    /// exchange client must match.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ExecutorPhase {
        self.phase
    }

    /// The open position, if any.
    #[must_use]
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// The risk guard.
    #[must_use]
    pub fn guard(&self) -> &RiskGuard {
        &self.guard
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Recover from a prior run's snapshot.
    ///
    /// Must run before the first cycle: a crash with an open position
    /// leaves the snapshot as the only record of that exposure.
    pub fn restore(&mut self) -> ExecutorResult<()> {
        let Some(state) = self.store.load()? else {
            return Ok(());
        };

        if state.dry_run != self.dry_run {
            warn!(
                snapshot_dry_run = state.dry_run,
                configured_dry_run = self.dry_run,
                "run mode changed since last snapshot"
            );
        }

        if let Some(position) = state.position {
            info!(
                symbol = %position.symbol,
                entry_notional = %position.entry_notional,
                funding_collected = %position.funding_collected,
                opened_at = %position.opened_at,
                "recovered open position from snapshot"
            );
            self.guard.on_opened();
            self.position = Some(position);
            self.phase = ExecutorPhase::Holding;
        }

        Ok(())
    }

    /// Run until the kill switch engages, the cycle budget runs out, or
    /// a fatal error forces shutdown.
    pub async fn run(&mut self) -> ExecutorResult<()> {
        self.validate_config()?;
        self.restore()?;

        let mode = if self.dry_run { "paper" } else { "live" };
        info!(symbol = %self.config.symbol, mode, "executor starting");
        self.notify(format!(
            "carry executor started: {} ({} mode)",
            self.config.symbol, mode
        ))
        .await;

        let mut cycles: u64 = 0;
        loop {
            if self.kill_switch.engaged() {
                info!(path = %self.kill_switch.path().display(), "kill switch engaged");
                self.notify("kill switch engaged, winding down").await;
                self.shutdown().await?;
                return Ok(());
            }

            let outcome = self.run_cycle().await;
            debug!(?outcome, phase = %self.phase, "cycle complete");

            if outcome == CycleOutcome::ShutDown {
                return Ok(());
            }

            if self.persist_failures >= self.config.max_persist_failures {
                error!(
                    failures = self.persist_failures,
                    "repeated persistence failures, unpersisted state risks losing position tracking"
                );
                self.notify("state persistence failing repeatedly, winding down")
                    .await;
                self.shutdown().await?;
                return Ok(());
            }

            cycles += 1;
            if let Some(max) = self.config.max_cycles {
                if cycles >= max {
                    info!(cycles, "cycle budget exhausted");
                    self.shutdown().await?;
                    return Ok(());
                }
            }

            self.clock
                .sleep(StdDuration::from_secs(self.config.poll_interval_secs))
                .await;
        }
    }

    /// Execute one cycle of the per-cycle algorithm.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let view = match self.fetch_market().await {
            Ok(view) => view,
            Err(e) if e.is_fatal() => return self.escalate_fatal(&e).await,
            Err(e) => {
                warn!(error = %e, "market fetch failed, skipping cycle");
                return CycleOutcome::Skipped;
            }
        };

        let now = self.clock.now();
        let to_funding = view.opportunity.next_funding_at - now;
        let collect_window = Duration::seconds(self.config.collect_window_secs);
        let unwind_window = Duration::seconds(self.config.unwind_window_secs);

        debug!(
            symbol = %view.opportunity.symbol,
            edge_bps = %view.opportunity.edge_bps,
            profitable = view.opportunity.profitable,
            to_funding = %format_duration(to_funding),
            "cycle view"
        );

        if self.position.is_some() {
            let mut outcome = CycleOutcome::Held;

            if to_funding <= collect_window {
                self.collect_funding(&view).await;
                outcome = CycleOutcome::Collected;
            } else {
                self.phase = ExecutorPhase::Holding;
            }

            if to_funding <= unwind_window {
                return match self.close_position().await {
                    Ok(()) => CycleOutcome::Closed,
                    Err(e) if e.is_fatal() => self.escalate_fatal(&e).await,
                    Err(e) => {
                        // Position retained; the close is retried next
                        // cycle.
                        warn!(error = %e, "unwind failed, skipping cycle");
                        CycleOutcome::Skipped
                    }
                };
            }

            return outcome;
        }

        if view.opportunity.profitable
            && self.guard.can_open(&view.opportunity)
            && to_funding > unwind_window
        {
            return match self.open_position(&view).await {
                Ok(()) => CycleOutcome::Opened,
                Err(ExecutorError::Exchange(e)) if e.is_fatal() => self.escalate_fatal(&e).await,
                Err(e) => {
                    warn!(error = %e, "open failed, skipping cycle");
                    self.phase = ExecutorPhase::Idle;
                    CycleOutcome::Skipped
                }
            };
        }

        CycleOutcome::Held
    }

    /// Force-close any open position and write final state. Terminal.
    pub async fn shutdown(&mut self) -> ExecutorResult<()> {
        if self.position.is_some() {
            info!("shutdown with open position, forcing close");
            if let Err(e) = self.close_position().await {
                // The snapshot still holds the position; the next start
                // recovers it.
                error!(error = %e, "forced close failed, position stays persisted");
            }
        }

        self.phase = ExecutorPhase::ShutDown;
        self.persist();
        self.journal_event(JournalEvent::Shutdown, None, None, None);
        if let Some(journal) = self.journal.as_mut() {
            if let Err(e) = journal.flush() {
                warn!(error = %e, "journal flush failed on shutdown");
            }
        }
        self.notify("carry executor shut down").await;
        info!("executor shut down");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cycle steps
    // ------------------------------------------------------------------

    async fn fetch_market(&self) -> Result<MarketView, ExchangeError> {
        let symbol = &self.config.symbol;
        let spot = self.exchange.get_ticker(symbol, MarketKind::Spot).await?;
        let perp = self.exchange.get_ticker(symbol, MarketKind::Perp).await?;
        let funding = self.exchange.get_funding(symbol).await?;

        let now = self.clock.now();
        let next_settlement = funding
            .next_funding_at
            .unwrap_or_else(|| next_funding_at(now));

        // Entry prices: the long leg pays the spot ask, the short leg
        // receives the perp bid.
        let opportunity = FundingOpportunity::new(
            symbol.clone(),
            funding.rate,
            spot.ask,
            perp.bid,
            self.config.notional,
            self.config.fee_bps,
            self.config.slippage_bps,
            self.config.min_edge_bps,
            next_settlement,
        );

        Ok(MarketView {
            spot,
            perp,
            funding,
            opportunity,
        })
    }

    async fn open_position(&mut self, view: &MarketView) -> ExecutorResult<()> {
        self.phase = ExecutorPhase::Opening;
        let symbol = self.config.symbol.clone();
        let leverage = self.config.leverage;

        let spot_size = size_position(self.config.notional, view.spot.ask, leverage)?;
        let futures_size = size_position(self.config.notional, view.perp.bid, leverage)?;

        self.exchange.set_leverage(&symbol, leverage).await?;

        let spot_fill = self
            .exchange
            .place_order(&OrderRequest::market(
                symbol.as_str(),
                MarketKind::Spot,
                OrderSide::Buy,
                spot_size,
            ))
            .await?;

        let futures_fill = match self
            .exchange
            .place_order(&OrderRequest::market(
                symbol.as_str(),
                MarketKind::Perp,
                OrderSide::Sell,
                futures_size,
            ))
            .await
        {
            Ok(fill) => fill,
            Err(e) => {
                // The spot leg is live with no hedge. Flatten it rather
                // than retain naked exposure.
                error!(error = %e, "futures leg failed after spot fill, unwinding spot leg");
                let compensate = OrderRequest::market(
                    symbol.as_str(),
                    MarketKind::Spot,
                    OrderSide::Sell,
                    spot_fill.filled_size,
                );
                if let Err(unwind_err) = self.exchange.place_order(&compensate).await {
                    error!(error = %unwind_err, "compensating spot sell failed");
                    self.notify(format!(
                        "WARNING: naked spot exposure of {} {} after failed open",
                        spot_fill.filled_size, symbol
                    ))
                    .await;
                }
                return Err(e.into());
            }
        };

        let now = self.clock.now();
        let position = Position::new(
            symbol.clone(),
            spot_fill.filled_size,
            futures_fill.filled_size,
            spot_fill.avg_price,
            futures_fill.avg_price,
            self.config.notional,
            now,
        );

        info!(
            symbol = %symbol,
            spot_size = %position.spot_size,
            futures_size = %position.futures_size,
            spot_entry = %position.spot_entry_price,
            futures_entry = %position.futures_entry_price,
            edge_bps = %view.opportunity.edge_bps,
            "position opened"
        );

        self.position = Some(position);
        self.guard.on_opened();
        self.phase = ExecutorPhase::Holding;

        self.journal_event(
            JournalEvent::Opened,
            Some(self.config.notional),
            None,
            None,
        );
        self.persist();
        self.notify(format!(
            "opened {} pair: notional {}, edge {} bps, next funding in {}",
            symbol,
            self.config.notional,
            view.opportunity.edge_bps,
            format_duration(view.opportunity.next_funding_at - now),
        ))
        .await;

        Ok(())
    }

    async fn collect_funding(&mut self, view: &MarketView) {
        let Some(position) = self.position.as_mut() else {
            return;
        };

        // Mark at the perp's last trade for the accrual.
        let payment = position.accrue_funding(view.perp.last, view.funding.rate);
        let collected = position.funding_collected;

        info!(
            symbol = %self.config.symbol,
            payment = %payment,
            funding_collected = %collected,
            "funding accrued"
        );

        self.phase = ExecutorPhase::NearFunding;
        self.journal_event(JournalEvent::FundingCollected, None, Some(collected), None);
        self.persist();
        self.notify(format!(
            "collected funding payment {} on {} (total {})",
            payment, self.config.symbol, collected
        ))
        .await;
    }

    async fn close_position(&mut self) -> Result<(), ExchangeError> {
        let Some(mut position) = self.position.clone() else {
            return Ok(());
        };

        self.phase = ExecutorPhase::Closing;
        let symbol = position.symbol.clone();

        // Exit prices mirror entry: sell spot at the bid, buy the perp
        // back at the ask.
        let spot_fill = self
            .exchange
            .place_order(&OrderRequest::market(
                symbol.as_str(),
                MarketKind::Spot,
                OrderSide::Sell,
                position.spot_size,
            ))
            .await?;

        let futures_fill = self
            .exchange
            .place_order(
                &OrderRequest::market(
                    symbol.as_str(),
                    MarketKind::Perp,
                    OrderSide::Buy,
                    position.futures_size,
                )
                .reduce_only(),
            )
            .await?;

        let pnl = position.close_pnl(spot_fill.avg_price, futures_fill.avg_price);
        position.realized_pnl = Some(pnl);
        let held_for = position.age_at(self.clock.now());

        info!(
            symbol = %symbol,
            pnl = %pnl,
            funding_collected = %position.funding_collected,
            held_for = %format_duration(held_for),
            "position closed"
        );

        self.journal_event(
            JournalEvent::Closed,
            Some(position.entry_notional),
            Some(position.funding_collected),
            Some(pnl),
        );

        self.position = None;
        self.guard.on_closed();
        self.phase = ExecutorPhase::Idle;
        self.persist();
        self.notify(format!(
            "closed {} pair: pnl {} (funding {}), held {}",
            symbol,
            pnl,
            position.funding_collected,
            format_duration(held_for),
        ))
        .await;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Support
    // ------------------------------------------------------------------

    fn validate_config(&self) -> ExecutorResult<()> {
        if !self.guard.validate_leverage(self.config.leverage) {
            return Err(ExecutorError::Config(format!(
                "leverage {} outside guard bounds",
                self.config.leverage
            )));
        }
        if self.config.unwind_window_secs >= self.config.collect_window_secs {
            return Err(ExecutorError::Config(format!(
                "unwind window {}s must be tighter than collect window {}s",
                self.config.unwind_window_secs, self.config.collect_window_secs
            )));
        }
        Ok(())
    }

    async fn escalate_fatal(&mut self, error: &ExchangeError) -> CycleOutcome {
        error!(error = %error, "fatal exchange error, forcing shutdown");
        self.notify(format!("FATAL exchange error: {error}; winding down"))
            .await;
        if let Err(e) = self.shutdown().await {
            error!(error = %e, "shutdown after fatal error incomplete");
        }
        CycleOutcome::ShutDown
    }

    /// Write the snapshot. Failures are counted, not propagated: the
    /// loop keeps operating in-memory and `run` escalates once the
    /// failure budget is spent.
    fn persist(&mut self) {
        let state = RunState {
            timestamp: self.clock.now(),
            dry_run: self.dry_run,
            position: self.position.clone(),
        };

        match self.store.save(&state) {
            Ok(()) => self.persist_failures = 0,
            Err(e) => {
                self.persist_failures += 1;
                error!(
                    error = %e,
                    consecutive = self.persist_failures,
                    "snapshot write failed"
                );
            }
        }
    }

    fn journal_event(
        &mut self,
        event: JournalEvent,
        notional: Option<Decimal>,
        funding_collected: Option<Decimal>,
        realized_pnl: Option<Decimal>,
    ) {
        let timestamp_ms = self.clock.now().timestamp_millis();
        if let Some(journal) = self.journal.as_mut() {
            let record = JournalRecord {
                timestamp_ms,
                event,
                symbol: self.config.symbol.clone(),
                notional,
                funding_collected,
                realized_pnl,
            };
            if let Err(e) = journal.record(record) {
                warn!(error = %e, "journal write failed");
            }
        }
    }

    async fn notify(&self, text: impl AsRef<str>) {
        // Best effort: the sink logs its own failures.
        let _ = self.sink.send(text.as_ref()).await;
    }
}
