//! Market Replay Binary
//!
//! Replays one ticker's candles from JSON files and logs every snapshot.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-replay
//! ```
//!
//! # Environment Variables
//!
//! - `MARKET_REPLAY_CONFIG`: Path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: Overrides the configured log filter

use std::sync::Arc;

use anyhow::Context;
use market_replay::config::{self, Config, DEFAULT_CONFIG_PATH};
use market_replay::observability::init_tracing;
use market_replay::simulation::{
    ChannelTradeSink, DriverConfig, PersistedTrade, Simulation, SimulationDriver, SimulationEvent,
    SimulationSetup,
};
use market_replay::JsonFileDataSource;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "MARKET_REPLAY_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = config::load_config(Some(&path))
        .with_context(|| format!("failed to load config from {path}"))?;

    init_tracing(&config.observability.logging)?;
    log_config(&config, &path);

    let (sink, trades) = ChannelTradeSink::new();
    let trade_logger = tokio::spawn(log_trades(trades));

    let simulation = Simulation::setup(SimulationSetup::from(&config.simulation), Arc::new(sink))?;
    let source = Arc::new(JsonFileDataSource::new(config.data.dir.clone()));

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let mut handle = SimulationDriver::spawn_with_shutdown(
        simulation,
        source,
        DriverConfig::from(&config.simulation),
        shutdown,
    );

    while let Some(event) = handle.next_event().await {
        match event {
            SimulationEvent::Loaded { ticker, candles } => {
                tracing::info!(ticker = %ticker, candles, "Replay started");
            }
            SimulationEvent::Tick(snapshot) => {
                tracing::info!(
                    ticker = %snapshot.ticker,
                    timestamp = %snapshot.timestamp,
                    price = %snapshot.price,
                    equity = %snapshot.equity,
                    return_rate = %snapshot.return_rate,
                    drawdown = %snapshot.drawdown,
                    open_positions = snapshot.open_positions.len(),
                    "Tick"
                );
            }
            SimulationEvent::Terminal(notice) => {
                tracing::info!(kind = %notice.kind, reason = %notice.reason, "Replay finished");
            }
        }
    }

    let simulation = handle.join().await.context("driver task failed")?;
    let summary = simulation.summary();
    tracing::info!(
        ticker = simulation.ticker(),
        trades = summary.total_trades,
        win_rate = %summary.win_rate,
        realized_pnl = %summary.realized_pnl,
        cash = %summary.cash_balance,
        peak_equity = %summary.peak_equity,
        max_drawdown = %summary.max_drawdown,
        "Account summary"
    );

    // Dropping the simulation drops the sink and closes the trade channel.
    drop(simulation);
    trade_logger.await.context("trade logger failed")?;

    Ok(())
}

/// Log the loaded configuration.
fn log_config(config: &Config, path: &str) {
    tracing::info!(
        path,
        ticker = %config.simulation.ticker,
        user = %config.simulation.user,
        initial_balance = %config.simulation.initial_balance,
        speed = config.simulation.speed,
        interval = %config.simulation.interval,
        data_dir = %config.data.dir.display(),
        "Configuration loaded"
    );
}

/// Log every persisted trade as JSON until the sink is dropped.
async fn log_trades(mut trades: mpsc::UnboundedReceiver<PersistedTrade>) {
    while let Some(persisted) = trades.recv().await {
        match serde_json::to_string(&persisted) {
            Ok(json) => tracing::info!(trade = %json, "Trade persisted"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode trade"),
        }
    }
}

/// Cancel `shutdown` on Ctrl+C.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl+C, stopping replay");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });
}
