// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::panic
    )
)]

//! Market Replay - Rust Core Library
//!
//! Replays historical OHLC candles as a stream of synthetic intra-candle ticks
//! and keeps a paper-trading account marked against them.
//!
//! # Layout
//!
//! - `market`: candles, intervals and the `CandleDataSource` port
//! - `replay`: tick synthesis and the simulation clock state machine
//! - `ledger`: PnL calculators, positions, trade records and the account
//! - `simulation`: per-tick orchestration, trade sinks and the async driver
//! - `config`: YAML configuration with env interpolation
//! - `observability`: tracing subscriber setup and metrics
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use market_replay::{NoOpTradeSink, Simulation, SimulationSetup, UserId};
//! use rust_decimal_macros::dec;
//!
//! let setup = SimulationSetup::new("AAPL", UserId::new("demo"), dec!(10000), 10);
//! let mut sim = Simulation::setup(setup, Arc::new(NoOpTradeSink))?;
//! sim.load(&source).await?;
//!
//! while let Ok(snapshot) = sim.advance() {
//!     println!("{} equity={}", snapshot.price, snapshot.equity);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Configuration loading.
pub mod config;

/// Error types and the error-kind taxonomy.
pub mod error;

/// Paper-trading ledger.
pub mod ledger;

/// Historical market data.
pub mod market;

/// Tracing and metrics.
pub mod observability;

/// Tick synthesis and the simulation clock.
pub mod replay;

/// Simulation controller and driver.
pub mod simulation;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DataSourceError, ErrorKind, SimulationError};
pub use ledger::{Account, AccountSummary, Direction, ExitReason, Position, TradeRecord};
pub use market::{Candle, CandleDataSource, CandleInterval, InMemoryDataSource, JsonFileDataSource};
pub use replay::{ClockState, PlaybackSpeed, SimulationClock, Tick, TickSynthesizer};
pub use simulation::{
    DriverConfig, NoOpTradeSink, Simulation, SimulationDriver, SimulationEvent, SimulationHandle,
    SimulationSetup, Snapshot, TerminalNotice, TradeSink, UserId,
};
