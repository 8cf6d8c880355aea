//! Simulation clock: the candle/tick state machine.
//!
//! ```text
//!  Unloaded --load(ok)--> Ready --advance--> Playing --advance(last tick)--> Ended
//!      |                                        |
//!      +--load(empty/invalid) / fail--> Failed <+
//! ```
//!
//! `load` may be called from any state and resets the clock. `Ended` and
//! `Failed` are sticky: `advance` fails fast without touching the indices.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::history::{PriceHistory, PriceLog};
use super::speed::{DEFAULT_TICK_BUDGET, PlaybackSpeed};
use super::synthesizer::TickSynthesizer;
use crate::error::{DataSourceError, SimulationError};
use crate::market::{Candle, CandleInterval};
use crate::observability;

/// Clock lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClockState {
    /// No candles yet.
    Unloaded,
    /// Candles loaded, no ticks materialized.
    Ready,
    /// Ticks of the current candle are materialized.
    Playing,
    /// Every candle has been replayed.
    Ended,
    /// Load or data error; unusable until reloaded.
    Failed,
}

impl ClockState {
    /// Check if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Failed)
    }
}

/// One emitted intra-candle price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Synthesized price.
    pub price: Decimal,
    /// Index of the source candle.
    pub candle_index: usize,
    /// Position of this tick inside its candle.
    pub ordinal: usize,
    /// Number of ticks synthesized for the candle.
    pub ticks_in_candle: usize,
    /// Simulated time: candle start plus the ordinal's share of the interval.
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    /// Check if this is the last tick of its candle (the close).
    #[must_use]
    pub const fn is_candle_close(&self) -> bool {
        self.ordinal + 1 == self.ticks_in_candle
    }
}

/// Clock settings fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Playback speed multiplier.
    pub speed: PlaybackSpeed,
    /// Tick budget divided by the speed.
    pub tick_budget: usize,
    /// Candle width, used to timestamp ticks.
    pub interval: CandleInterval,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            speed: PlaybackSpeed::default(),
            tick_budget: DEFAULT_TICK_BUDGET,
            interval: CandleInterval::default(),
        }
    }
}

/// Stateful driver over a candle sequence.
#[derive(Debug)]
pub struct SimulationClock {
    ticker: String,
    config: ClockConfig,
    synthesizer: TickSynthesizer,
    candles: Vec<Candle>,
    candle_index: usize,
    current_ticks: Vec<Decimal>,
    tick_index: usize,
    state: ClockState,
    failure: Option<String>,
    history: PriceLog,
}

impl SimulationClock {
    /// Create an unloaded clock with an OS-seeded synthesizer.
    #[must_use]
    pub fn new(ticker: impl Into<String>, config: ClockConfig) -> Self {
        Self::with_synthesizer(ticker, config, TickSynthesizer::new())
    }

    /// Create an unloaded clock with a specific synthesizer.
    #[must_use]
    pub fn with_synthesizer(
        ticker: impl Into<String>,
        config: ClockConfig,
        synthesizer: TickSynthesizer,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            config,
            synthesizer,
            candles: Vec::new(),
            candle_index: 0,
            current_ticks: Vec::new(),
            tick_index: 0,
            state: ClockState::Unloaded,
            failure: None,
            history: PriceLog::default(),
        }
    }

    /// Load a candle sequence, resetting all playback state.
    ///
    /// # Errors
    ///
    /// - `DataSource(NoData)` if `candles` is empty.
    /// - `InvalidCandle` if any candle breaks OHLC bounds or the sequence is
    ///   out of order.
    ///
    /// On error the clock is left in `Failed`.
    pub fn load(&mut self, candles: Vec<Candle>) -> Result<(), SimulationError> {
        self.reset();

        if candles.is_empty() {
            let err = SimulationError::from(DataSourceError::NoData {
                ticker: self.ticker.clone(),
            });
            self.fail(&err);
            return Err(err);
        }

        let checked = candles.iter().try_for_each(Candle::validate).and_then(|()| {
            match candles.windows(2).find(|w| w[1].timestamp < w[0].timestamp) {
                Some(w) => Err(SimulationError::InvalidCandle {
                    timestamp: w[1].timestamp.to_rfc3339(),
                    message: format!("out of order after {}", w[0].timestamp.to_rfc3339()),
                }),
                None => Ok(()),
            }
        });
        if let Err(err) = checked {
            self.fail(&err);
            return Err(err);
        }

        info!(
            ticker = %self.ticker,
            candles = candles.len(),
            speed = %self.config.speed,
            ticks_per_candle = self.ticks_per_candle(),
            "Candles loaded"
        );

        self.candles = candles;
        self.state = ClockState::Ready;
        Ok(())
    }

    /// Move to `Failed`, recording the reason.
    pub fn fail(&mut self, error: &SimulationError) {
        warn!(ticker = %self.ticker, error = %error, "Simulation clock failed");
        self.state = ClockState::Failed;
        self.failure = Some(error.to_string());
        self.current_ticks.clear();
        self.tick_index = 0;
    }

    /// Emit the next tick.
    ///
    /// # Errors
    ///
    /// - `SimulationEnded` once every candle has been replayed.
    /// - `SimulationFailed` if the clock failed or was never loaded.
    ///
    /// Neither error mutates the clock.
    pub fn advance(&mut self) -> Result<Tick, SimulationError> {
        match self.state {
            ClockState::Unloaded => {
                return Err(SimulationError::SimulationFailed {
                    ticker: self.ticker.clone(),
                    reason: "no candles loaded".to_string(),
                });
            }
            ClockState::Failed => {
                return Err(SimulationError::SimulationFailed {
                    ticker: self.ticker.clone(),
                    reason: self
                        .failure
                        .clone()
                        .unwrap_or_else(|| "unknown failure".to_string()),
                });
            }
            ClockState::Ended => {
                return Err(SimulationError::SimulationEnded {
                    ticker: self.ticker.clone(),
                    candles: self.candles.len(),
                });
            }
            ClockState::Ready => {
                if let Err(err) = self.materialize() {
                    self.fail(&err);
                    return Err(SimulationError::SimulationFailed {
                        ticker: self.ticker.clone(),
                        reason: err.to_string(),
                    });
                }
                self.state = ClockState::Playing;
            }
            ClockState::Playing => {}
        }

        let Some(&price) = self.current_ticks.get(self.tick_index) else {
            let err = SimulationError::SimulationFailed {
                ticker: self.ticker.clone(),
                reason: format!("tick {} not materialized", self.tick_index),
            };
            self.fail(&err);
            return Err(err);
        };

        let tick = Tick {
            price,
            candle_index: self.candle_index,
            ordinal: self.tick_index,
            ticks_in_candle: self.current_ticks.len(),
            timestamp: self.tick_timestamp(self.tick_index),
        };

        self.history.push(price);
        self.tick_index += 1;
        observability::record_tick_emitted(&self.ticker);

        if self.tick_index >= self.current_ticks.len() {
            self.tick_index = 0;
            self.candle_index += 1;
            observability::record_candle_completed(&self.ticker);

            if self.candle_index == self.candles.len() {
                info!(
                    ticker = %self.ticker,
                    candles = self.candles.len(),
                    ticks = self.history.len(),
                    "Simulation ended"
                );
                self.current_ticks.clear();
                self.state = ClockState::Ended;
            } else if let Err(err) = self.materialize() {
                // Surfaces on the next advance.
                self.fail(&err);
            }
        }

        Ok(tick)
    }

    /// Change the speed; takes effect from the next materialized candle.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        debug!(ticker = %self.ticker, from = %self.config.speed, to = %speed, "Speed changed");
        self.config.speed = speed;
    }

    fn materialize(&mut self) -> Result<(), SimulationError> {
        let n = self.ticks_per_candle();
        let candle = self.candles.get(self.candle_index).ok_or_else(|| {
            SimulationError::SimulationFailed {
                ticker: self.ticker.clone(),
                reason: format!("candle {} out of range", self.candle_index),
            }
        })?;
        self.current_ticks = self.synthesizer.synthesize(candle, n)?;
        self.tick_index = 0;

        debug!(
            ticker = %self.ticker,
            candle_index = self.candle_index,
            ticks = n,
            "Materialized candle ticks"
        );
        Ok(())
    }

    fn tick_timestamp(&self, ordinal: usize) -> DateTime<Utc> {
        let start = self
            .candles
            .get(self.candle_index)
            .map_or_else(Utc::now, |c| c.timestamp);
        let n = self.current_ticks.len().max(1) as i64;
        let step_ms = self.config.interval.duration().num_milliseconds() / n;
        start + Duration::milliseconds(step_ms * ordinal as i64)
    }

    fn reset(&mut self) {
        self.candles.clear();
        self.candle_index = 0;
        self.current_ticks.clear();
        self.tick_index = 0;
        self.state = ClockState::Unloaded;
        self.failure = None;
        self.history = PriceLog::default();
    }

    /// Ticker being replayed.
    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ClockState {
        self.state
    }

    /// Clock settings.
    #[must_use]
    pub const fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Ticks synthesized per candle at the current speed.
    #[must_use]
    pub fn ticks_per_candle(&self) -> usize {
        self.config.speed.ticks_per_candle(self.config.tick_budget)
    }

    /// Index of the candle being replayed.
    #[must_use]
    pub const fn candle_index(&self) -> usize {
        self.candle_index
    }

    /// Index of the next tick within the current candle.
    #[must_use]
    pub const fn tick_index(&self) -> usize {
        self.tick_index
    }

    /// Number of loaded candles.
    #[must_use]
    pub fn candle_count(&self) -> usize {
        self.candles.len()
    }

    /// Candle currently being replayed, if any.
    #[must_use]
    pub fn current_candle(&self) -> Option<&Candle> {
        self.candles.get(self.candle_index)
    }

    /// Every emitted price so far, in emission order.
    #[must_use]
    pub fn price_history(&self) -> PriceHistory {
        self.history.view()
    }

    /// Most recently emitted price.
    #[must_use]
    pub fn last_price(&self) -> Option<Decimal> {
        self.history.view().last()
    }

    /// Failure reason when in `Failed`.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Fraction of candles fully replayed.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.candles.is_empty() {
            return 0.0;
        }
        self.candle_index as f64 / self.candles.len() as f64
    }
}
