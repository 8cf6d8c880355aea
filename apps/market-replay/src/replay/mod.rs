//! Candle replay: tick synthesis and the simulation clock.
//!
//! # Example
//!
//! ```ignore
//! use market_replay::replay::{ClockConfig, PlaybackSpeed, SimulationClock};
//!
//! let mut clock = SimulationClock::new("AAPL", ClockConfig {
//!     speed: PlaybackSpeed::new(10)?,
//!     ..ClockConfig::default()
//! });
//! clock.load(candles)?;
//!
//! while let Ok(tick) = clock.advance() {
//!     println!("{} {}", tick.timestamp, tick.price);
//! }
//! ```

mod clock;
mod history;
mod speed;
mod synthesizer;

pub use clock::{ClockConfig, ClockState, SimulationClock, Tick};
pub use history::PriceHistory;
pub use speed::{DEFAULT_TICK_BUDGET, PlaybackSpeed, VALID_SPEEDS};
pub use synthesizer::{MIN_TICKS_PER_CANDLE, TickSynthesizer, synthesize_ticks};
