//! Integration Tests for Candle Replay
//!
//! Drives the public API end to end: JSON candle files → data source →
//! simulation controller / async driver → snapshots, trade sink and summary.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use market_replay::replay::ClockState;
use market_replay::simulation::{ChannelTradeSink, InMemoryTradeSink};
use market_replay::{
    Candle, CandleDataSource, CandleInterval, Direction, DriverConfig, ErrorKind, ExitReason,
    JsonFileDataSource, NoOpTradeSink, Simulation, SimulationDriver, SimulationEvent,
    SimulationSetup, TickSynthesizer, UserId,
};

// =============================================================================
// Fixtures
// =============================================================================

const SEED: u64 = 2024;

fn candles() -> Vec<Candle> {
    vec![
        Candle::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap(),
            dec!(100),
            dec!(110),
            dec!(90),
            dec!(105),
        ),
        Candle::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
            dec!(105),
            dec!(112),
            dec!(104),
            dec!(111),
        ),
        Candle::new(
            Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap(),
            dec!(111),
            dec!(111.5),
            dec!(95.25),
            dec!(96),
        ),
    ]
}

fn write_candles(ticker: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let json = serde_json::to_string_pretty(&candles()).unwrap();
    std::fs::write(dir.path().join(format!("{ticker}.json")), json).unwrap();
    dir
}

/// Speed 25 over the default budget of 300 gives 12 ticks per candle.
fn setup() -> SimulationSetup {
    SimulationSetup::new("AAPL", UserId::new("demo"), dec!(10000), 25).with_seed(SEED)
}

async fn loaded(sink: Arc<dyn market_replay::TradeSink>) -> (Simulation, TempDir) {
    let dir = write_candles("AAPL");
    let source = JsonFileDataSource::new(dir.path());
    let mut sim = Simulation::setup(setup(), sink).unwrap();
    assert_eq!(sim.load(&source).await.unwrap(), 3);
    (sim, dir)
}

fn drain(sim: &mut Simulation) -> Vec<Decimal> {
    let mut prices = Vec::new();
    while let Ok(snapshot) = sim.advance() {
        prices.push(snapshot.price);
    }
    prices
}

// =============================================================================
// Controller
// =============================================================================

#[tokio::test]
async fn test_replay_is_one_full_traversal() {
    let (mut sim, _dir) = loaded(Arc::new(NoOpTradeSink)).await;

    let mut synthesizer = TickSynthesizer::seeded(SEED);
    let expected: Vec<Decimal> = candles()
        .iter()
        .flat_map(|c| synthesizer.synthesize(c, 12).unwrap())
        .collect();

    let emitted = drain(&mut sim);
    assert_eq!(emitted, expected);
    assert_eq!(sim.clock().price_history().to_vec(), expected);
    assert_eq!(sim.state(), ClockState::Ended);
}

#[tokio::test]
async fn test_every_candle_bounds_its_ticks() {
    let (mut sim, _dir) = loaded(Arc::new(NoOpTradeSink)).await;
    let source = candles();

    let mut previous = None;
    while let Ok(snapshot) = sim.advance() {
        let candle = &source[snapshot.candle_index];
        assert!(candle.contains(snapshot.price));
        if let Some(prev) = previous {
            assert!(snapshot.timestamp > prev);
        }
        previous = Some(snapshot.timestamp);
    }
}

#[tokio::test]
async fn test_terminal_state_is_sticky() {
    let (mut sim, _dir) = loaded(Arc::new(NoOpTradeSink)).await;
    drain(&mut sim);

    let candle_index = sim.clock().candle_index();
    let tick_index = sim.clock().tick_index();
    for _ in 0..3 {
        let err = sim.advance().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SimulationEnded);
        assert!(err.kind().is_terminal());
    }
    assert_eq!(sim.clock().candle_index(), candle_index);
    assert_eq!(sim.clock().tick_index(), tick_index);
}

#[tokio::test]
async fn test_reload_restarts_replay() {
    let (mut sim, dir) = loaded(Arc::new(NoOpTradeSink)).await;
    assert_eq!(drain(&mut sim).len(), 36);

    let source = JsonFileDataSource::new(dir.path());
    sim.load(&source).await.unwrap();
    assert_eq!(sim.state(), ClockState::Ready);
    assert!(sim.clock().price_history().is_empty());
    assert_eq!(drain(&mut sim).len(), 36);
}

#[tokio::test]
async fn test_short_limit_auto_close_is_persisted() {
    let (sink, mut persisted) = ChannelTradeSink::new();
    let (mut sim, _dir) = loaded(Arc::new(sink)).await;

    let first = sim.advance().unwrap();
    assert_eq!(first.price, dec!(100));

    // The candle high of 110 is always emitted, so a 109 stop must fire.
    let position = sim
        .open_position(Direction::Short, dec!(2000), Some(dec!(109)))
        .unwrap();
    assert_eq!(position.quantity, dec!(20));
    assert_eq!(sim.account().cash_balance(), dec!(8000));

    let mut closed = Vec::new();
    while closed.is_empty() {
        closed = sim.advance().unwrap().closed_trades;
    }

    let record = &closed[0];
    assert_eq!(record.exit_reason, ExitReason::Limit);
    assert!(record.exit_price >= dec!(109));
    assert_eq!(
        record.realized_pnl,
        (dec!(100) - record.exit_price) * dec!(20)
    );
    assert_eq!(
        sim.account().cash_balance(),
        dec!(8000) + dec!(2000) + record.realized_pnl
    );

    let trade = persisted.try_recv().unwrap();
    assert_eq!(trade.user, UserId::new("demo"));
    assert_eq!(trade.trade, *record);
}

#[tokio::test]
async fn test_drawdown_and_summary_after_losing_trade() {
    let sink = Arc::new(InMemoryTradeSink::new());
    let (mut sim, _dir) = loaded(sink.clone()).await;
    sim.advance().unwrap();

    let position = sim
        .open_position(Direction::Long, dec!(5000), None)
        .unwrap();

    // Run into the third candle, which closes well below the entry.
    while sim.clock().candle_index() < 2 {
        sim.advance().unwrap();
    }
    let mut last = None;
    while let Ok(snapshot) = sim.advance() {
        assert!(snapshot.drawdown >= Decimal::ZERO);
        assert!(snapshot.max_drawdown >= snapshot.drawdown);
        last = Some(snapshot);
    }
    let last = last.unwrap();
    assert_eq!(last.price, dec!(96));

    let record = sim.close_position(position.id).unwrap();
    assert_eq!(record.exit_reason, ExitReason::Manual);
    assert_eq!(record.realized_pnl, dec!(-200));

    let summary = sim.summary();
    assert_eq!(summary.total_trades, 1);
    assert_eq!(summary.losing_trades, 1);
    assert_eq!(summary.largest_loss, dec!(-200));
    assert_eq!(summary.cash_balance, dec!(9800));
    assert!(summary.peak_equity >= dec!(10000));
    assert!(summary.max_drawdown > Decimal::ZERO);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn test_malformed_file_fails_load() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("AAPL.json"), "{ not json").unwrap();
    let source = JsonFileDataSource::new(dir.path());

    let mut sim = Simulation::setup(setup(), Arc::new(NoOpTradeSink)).unwrap();
    let err = sim.load(&source).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataSourceError);
    assert_eq!(sim.state(), ClockState::Failed);
    assert_eq!(
        sim.advance().unwrap_err().kind(),
        ErrorKind::SimulationFailed
    );
}

#[tokio::test]
async fn test_inverted_candle_rejected_at_load() {
    let dir = TempDir::new().unwrap();
    let mut bad = candles();
    bad[1].high = dec!(100);
    bad[1].low = dec!(120);
    std::fs::write(
        dir.path().join("AAPL_1d.json"),
        serde_json::to_string(&bad).unwrap(),
    )
    .unwrap();
    let source = JsonFileDataSource::new(dir.path());

    let mut sim = Simulation::setup(setup(), Arc::new(NoOpTradeSink)).unwrap();
    let err = sim.load(&source).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCandle);
    assert_eq!(sim.state(), ClockState::Failed);
}

// =============================================================================
// Driver
// =============================================================================

#[tokio::test]
async fn test_driver_end_to_end_from_files() {
    let dir = write_candles("MSFT");
    let source: Arc<dyn CandleDataSource> = Arc::new(JsonFileDataSource::new(dir.path()));
    let setup = SimulationSetup::new("msft", UserId::new("demo"), dec!(5000), 30)
        .with_interval(CandleInterval::OneDay)
        .with_seed(SEED);
    let simulation = Simulation::setup(setup, Arc::new(NoOpTradeSink)).unwrap();

    let config = DriverConfig::default().with_tick_interval(Duration::from_millis(1));
    let mut handle = SimulationDriver::spawn(simulation, source, config);

    let mut ticks = 0;
    let mut terminal = None;
    while let Some(event) = handle.next_event().await {
        match event {
            SimulationEvent::Loaded { ticker, candles } => {
                assert_eq!(ticker, "MSFT");
                assert_eq!(candles, 3);
            }
            SimulationEvent::Tick(snapshot) => {
                ticks += 1;
                assert_eq!(snapshot.price_history.len(), ticks);
                assert_eq!(snapshot.equity, dec!(5000));
            }
            SimulationEvent::Terminal(notice) => terminal = Some(notice),
        }
    }

    // 300 / 30 = 10 ticks per candle.
    assert_eq!(ticks, 30);
    let notice = terminal.unwrap();
    assert_eq!(notice.kind, ErrorKind::SimulationEnded);
    assert!(notice.is_completed());

    let sim = handle.join().await.unwrap();
    assert_eq!(sim.state(), ClockState::Ended);
}
