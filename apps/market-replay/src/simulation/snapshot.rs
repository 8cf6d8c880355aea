//! Per-tick output of the simulation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, SimulationError};
use crate::ledger::{Position, TradeRecord};
use crate::replay::PriceHistory;

/// Account and market view after one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Ticker being replayed.
    pub ticker: String,
    /// Simulated time of the tick.
    pub timestamp: DateTime<Utc>,
    /// Source candle index.
    pub candle_index: usize,
    /// Tick position inside the candle.
    pub tick_ordinal: usize,
    /// Emitted price.
    pub price: Decimal,
    /// `cash + Σ unrealized PnL`.
    pub equity: Decimal,
    /// Return relative to the initial balance.
    pub return_rate: Decimal,
    /// Drawdown from peak equity at this tick.
    pub drawdown: Decimal,
    /// Worst drawdown so far.
    pub max_drawdown: Decimal,
    /// Cash balance.
    pub cash: Decimal,
    /// Every price emitted since load, oldest first.
    pub price_history: PriceHistory,
    /// Positions still open after limit checks.
    pub open_positions: Vec<Position>,
    /// Trades auto-closed by this tick.
    pub closed_trades: Vec<TradeRecord>,
}

/// Why a simulation stopped producing ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalNotice {
    /// Ticker being replayed.
    pub ticker: String,
    /// Error kind tag.
    pub kind: ErrorKind,
    /// Human-readable reason.
    pub reason: String,
}

impl TerminalNotice {
    /// Build a notice from the error that ended the run.
    #[must_use]
    pub fn from_error(ticker: &str, error: &SimulationError) -> Self {
        Self {
            ticker: ticker.to_string(),
            kind: error.kind(),
            reason: error.to_string(),
        }
    }

    /// Check if the run completed normally.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.kind == ErrorKind::SimulationEnded
    }
}
