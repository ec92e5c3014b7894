//! Lifecycle tests for the execution loop.
//!
//! Driven entirely by the paper backend and a manual clock: no network,
//! no real time.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

use carry_core::{Position, Price, Size};
use carry_exchange::{FundingInfo, MarketKind, OrderSide, PaperExchange, Ticker};
use carry_executor::{
    CycleOutcome, Executor, ExecutorConfig, ExecutorPhase, KillSwitch, ManualClock,
};
use carry_notify::LogSink;
use carry_risk::{RiskConfig, RiskGuard};
use carry_state::{RunState, StateStore};

const SYMBOL: &str = "BTCUSDT";

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap()
}

/// Paper backend with clean round-number quotes: both legs size to
/// exactly 0.02 at notional 1000.
fn quoted_paper() -> Arc<PaperExchange> {
    let paper = Arc::new(PaperExchange::new());
    paper.set_quote(
        SYMBOL,
        MarketKind::Spot,
        Ticker::new(
            Price::new(dec!(49995)),
            Price::new(dec!(50000)),
            Price::new(dec!(49998)),
        ),
    );
    paper.set_quote(
        SYMBOL,
        MarketKind::Perp,
        Ticker::new(
            Price::new(dec!(50000)),
            Price::new(dec!(50005)),
            Price::new(dec!(50000)),
        ),
    );
    paper
}

/// 20 bps funding per period: 11 bps edge after default costs.
fn rich_funding(next_funding_at: DateTime<Utc>) -> FundingInfo {
    FundingInfo {
        rate: dec!(0.002),
        next_funding_at: Some(next_funding_at),
    }
}

struct Harness {
    paper: Arc<PaperExchange>,
    clock: Arc<ManualClock>,
    store: StateStore,
    kill_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            paper: quoted_paper(),
            clock: Arc::new(ManualClock::new(start_time())),
            store: StateStore::new(dir.path().join("state.json")),
            kill_path: dir.path().join("carry.kill"),
            _dir: dir,
        }
    }

    fn executor(&self) -> Executor {
        self.executor_with_config(ExecutorConfig::default())
    }

    fn executor_with_config(&self, config: ExecutorConfig) -> Executor {
        Executor::new(
            config,
            self.paper.clone(),
            Arc::new(LogSink),
            RiskGuard::new(RiskConfig::default()),
            self.store.clone(),
            self.clock.clone(),
            KillSwitch::new(&self.kill_path),
        )
    }
}

#[tokio::test]
async fn test_profitable_cycle_opens_position() {
    let harness = Harness::new();
    // Settlement hours away: well outside the unwind window.
    harness
        .paper
        .set_funding(SYMBOL, rich_funding(start_time() + Duration::hours(4)));

    let mut executor = harness.executor();
    executor.restore().unwrap();
    assert_eq!(executor.phase(), ExecutorPhase::Idle);

    let outcome = executor.run_cycle().await;
    assert_eq!(outcome, CycleOutcome::Opened);
    assert_eq!(executor.phase(), ExecutorPhase::Holding);

    // Both legs sized from notional 1000 at their own entry prices.
    let position = executor.position().expect("position should be open");
    assert_eq!(position.spot_size, Size::new(dec!(0.02)));
    assert_eq!(position.futures_size, Size::new(dec!(0.02)));
    assert_eq!(position.spot_entry_price, Price::new(dec!(50000)));
    assert_eq!(position.futures_entry_price, Price::new(dec!(50000)));
    assert_eq!(position.funding_collected, dec!(0));

    // The guard counted exactly one open.
    assert_eq!(executor.guard().open_positions(), 1);

    // Paired orders: spot buy then perp sell.
    let orders = harness.paper.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].market, MarketKind::Spot);
    assert_eq!(orders[0].side, OrderSide::Buy);
    assert_eq!(orders[1].market, MarketKind::Perp);
    assert_eq!(orders[1].side, OrderSide::Sell);

    // The transition was persisted before anything else could happen.
    let snapshot = harness.store.load().unwrap().expect("snapshot written");
    assert!(snapshot.position.is_some());
}

#[tokio::test]
async fn test_thin_edge_holds_idle() {
    let harness = Harness::new();
    // 5 bps funding: -4 bps edge after costs.
    harness.paper.set_funding(
        SYMBOL,
        FundingInfo {
            rate: dec!(0.0005),
            next_funding_at: Some(start_time() + Duration::hours(4)),
        },
    );

    let mut executor = harness.executor();
    let outcome = executor.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Held);
    assert_eq!(executor.phase(), ExecutorPhase::Idle);
    assert!(executor.position().is_none());
    assert!(harness.paper.orders().is_empty());
}

#[tokio::test]
async fn test_collect_window_accrues_funding() {
    let harness = Harness::new();
    let settlement = start_time() + Duration::hours(4);
    harness.paper.set_funding(SYMBOL, rich_funding(settlement));

    let mut executor = harness.executor();
    assert_eq!(executor.run_cycle().await, CycleOutcome::Opened);

    // Move inside the collect window but outside the unwind window.
    harness.clock.set(settlement - Duration::seconds(200));
    let outcome = executor.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Collected);
    assert_eq!(executor.phase(), ExecutorPhase::NearFunding);

    // 0.02 * 50000 * 0.002 = 2 per accrual.
    let position = executor.position().unwrap();
    assert_eq!(position.funding_collected, dec!(2));

    // Accrual was persisted.
    let snapshot = harness.store.load().unwrap().unwrap();
    assert_eq!(
        snapshot.position.unwrap().funding_collected,
        dec!(2)
    );
}

#[tokio::test]
async fn test_unwind_window_closes_position() {
    let harness = Harness::new();
    let settlement = start_time() + Duration::hours(4);
    harness.paper.set_funding(SYMBOL, rich_funding(settlement));

    let mut executor = harness.executor();
    assert_eq!(executor.run_cycle().await, CycleOutcome::Opened);

    harness.clock.set(settlement - Duration::seconds(30));
    let outcome = executor.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Closed);
    assert_eq!(executor.phase(), ExecutorPhase::Idle);
    assert!(executor.position().is_none());
    assert_eq!(executor.guard().open_positions(), 0);

    // Open pair + closing pair.
    let orders = harness.paper.orders();
    assert_eq!(orders.len(), 4);
    assert_eq!(orders[2].side, OrderSide::Sell);
    assert_eq!(orders[2].market, MarketKind::Spot);
    assert_eq!(orders[3].side, OrderSide::Buy);
    assert_eq!(orders[3].market, MarketKind::Perp);
    assert!(orders[3].reduce_only);

    // The cleared position was persisted.
    let snapshot = harness.store.load().unwrap().unwrap();
    assert!(snapshot.position.is_none());
}

#[tokio::test]
async fn test_fetch_failure_skips_cycle_without_state_change() {
    let harness = Harness::new();
    harness
        .paper
        .set_funding(SYMBOL, rich_funding(start_time() + Duration::hours(4)));
    harness.paper.fail_next(1);

    let mut executor = harness.executor();
    let outcome = executor.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Skipped);
    assert!(executor.position().is_none());
    assert!(harness.paper.orders().is_empty());

    // The next cycle recovers.
    assert_eq!(executor.run_cycle().await, CycleOutcome::Opened);
}

#[tokio::test]
async fn test_auth_failure_escalates_to_shutdown() {
    let harness = Harness::new();
    harness.paper.revoke_auth();

    let mut executor = harness.executor();
    let outcome = executor.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::ShutDown);
    assert_eq!(executor.phase(), ExecutorPhase::ShutDown);
}

#[tokio::test]
async fn test_crash_recovery_reconstructs_holding_state() {
    let harness = Harness::new();

    let position = Position::new(
        SYMBOL,
        Size::new(dec!(0.02)),
        Size::new(dec!(0.02)),
        Price::new(dec!(50000)),
        Price::new(dec!(50000)),
        dec!(1000),
        start_time() - Duration::hours(1),
    );
    let mut persisted = position.clone();
    persisted.accrue_funding(Price::new(dec!(50000)), dec!(0.002));

    harness
        .store
        .save(&RunState {
            timestamp: start_time(),
            dry_run: true,
            position: Some(persisted.clone()),
        })
        .unwrap();

    // A fresh executor instance, as after a crash and restart.
    let mut executor = harness.executor();
    executor.restore().unwrap();

    assert_eq!(executor.phase(), ExecutorPhase::Holding);
    assert_eq!(executor.position(), Some(&persisted));
    assert_eq!(executor.guard().open_positions(), 1);
}

#[tokio::test]
async fn test_recovered_position_is_managed_by_the_loop() {
    let harness = Harness::new();
    let settlement = start_time() + Duration::seconds(30);
    harness.paper.set_funding(SYMBOL, rich_funding(settlement));

    harness
        .store
        .save(&RunState {
            timestamp: start_time() - Duration::hours(1),
            dry_run: true,
            position: Some(Position::new(
                SYMBOL,
                Size::new(dec!(0.02)),
                Size::new(dec!(0.02)),
                Price::new(dec!(50000)),
                Price::new(dec!(50000)),
                dec!(1000),
                start_time() - Duration::hours(1),
            )),
        })
        .unwrap();

    let mut executor = harness.executor();
    executor.restore().unwrap();

    // Settlement is 30s out: the recovered position goes straight
    // through collect + unwind.
    let outcome = executor.run_cycle().await;
    assert_eq!(outcome, CycleOutcome::Closed);
    assert!(executor.position().is_none());
    assert_eq!(executor.guard().open_positions(), 0);
}

#[tokio::test]
async fn test_kill_switch_stops_the_loop() {
    let harness = Harness::new();
    harness
        .paper
        .set_funding(SYMBOL, rich_funding(start_time() + Duration::hours(4)));
    std::fs::write(&harness.kill_path, b"stop").unwrap();

    let mut executor = harness.executor();
    executor.run().await.unwrap();

    assert_eq!(executor.phase(), ExecutorPhase::ShutDown);
    // Shut down before any order was placed.
    assert!(harness.paper.orders().is_empty());

    let snapshot = harness.store.load().unwrap().unwrap();
    assert!(snapshot.position.is_none());
}

#[tokio::test]
async fn test_bounded_run_closes_out_at_cycle_budget() {
    let harness = Harness::new();
    harness
        .paper
        .set_funding(SYMBOL, rich_funding(start_time() + Duration::hours(6)));

    let config = ExecutorConfig {
        max_cycles: Some(3),
        ..ExecutorConfig::default()
    };
    let mut executor = harness.executor_with_config(config);
    executor.run().await.unwrap();

    // Opened on the first cycle, held after, force-closed at the end.
    assert_eq!(executor.phase(), ExecutorPhase::ShutDown);
    assert!(executor.position().is_none());
    assert_eq!(harness.paper.orders().len(), 4);

    let snapshot = harness.store.load().unwrap().unwrap();
    assert!(snapshot.position.is_none());
}

#[tokio::test]
async fn test_invalid_leverage_fails_fast() {
    let harness = Harness::new();
    let config = ExecutorConfig {
        leverage: 10,
        ..ExecutorConfig::default()
    };
    let mut executor = harness.executor_with_config(config);

    let result = executor.run().await;
    assert!(result.is_err());
}
