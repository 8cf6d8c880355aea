//! Simulation and data-source configuration.

use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::market::CandleInterval;
use crate::replay::DEFAULT_TICK_BUDGET;

/// Settings for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationSettings {
    /// Ticker to replay.
    pub ticker: String,
    /// Opaque identity attached to persisted trades.
    #[serde(default = "default_user")]
    pub user: String,
    /// Starting cash.
    pub initial_balance: Decimal,
    /// Playback speed multiplier (5, 10, ..., 30).
    #[serde(default = "default_speed")]
    pub speed: u32,
    /// Tick budget divided by the speed to get ticks per candle.
    #[serde(default = "default_tick_budget")]
    pub tick_budget: usize,
    /// Wall-clock delay between ticks (milliseconds).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Candle width requested from the data source.
    #[serde(default)]
    pub interval: CandleInterval,
    /// Fixed RNG seed for reproducible tick synthesis.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            user: default_user(),
            initial_balance: Decimal::new(10_000, 0),
            speed: default_speed(),
            tick_budget: default_tick_budget(),
            tick_interval_ms: default_tick_interval_ms(),
            interval: CandleInterval::default(),
            seed: None,
        }
    }
}

/// Where historical candles are read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataConfig {
    /// Directory holding `<TICKER>[_<interval>].json` files.
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

fn default_user() -> String {
    "local".to_string()
}

const fn default_speed() -> u32 {
    10
}

const fn default_tick_budget() -> usize {
    DEFAULT_TICK_BUDGET
}

const fn default_tick_interval_ms() -> u64 {
    250
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
