//! Intra-candle tick synthesis.
//!
//! Expands one OHLC candle into `n` ordered prices:
//!
//! - index 0 is the open, index `n - 1` is the close;
//! - two distinct interior indices, picked uniformly from `[1, n - 2]`, carry the
//!   exact low and the exact high;
//! - every other interior index is an independent uniform draw from the open
//!   interval `(low, high)`.
//!
//! Output is random on purpose. Only the distributional shape is guaranteed.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::error::SimulationError;
use crate::market::Candle;

/// Smallest tick count with room for both interior extremes.
pub const MIN_TICKS_PER_CANDLE: usize = 4;

/// Resolution of interior draws (9 decimal places of the candle range).
const UNIT_SCALE: i64 = 1_000_000_000;
const UNIT_DP: u32 = 9;

/// Synthesize `n` intra-candle prices using the supplied RNG.
///
/// The candle is not repaired: only an inverted range is rejected.
///
/// # Errors
///
/// - `InvalidCandle` if `high < low` (checked first, for any `n`).
/// - `InvalidConfiguration` if `n < MIN_TICKS_PER_CANDLE`.
pub fn synthesize_ticks<R: Rng + ?Sized>(
    candle: &Candle,
    n: usize,
    rng: &mut R,
) -> Result<Vec<Decimal>, SimulationError> {
    if candle.high < candle.low {
        return Err(SimulationError::InvalidCandle {
            timestamp: candle.timestamp.to_rfc3339(),
            message: format!("high {} below low {}", candle.high, candle.low),
        });
    }
    if n < MIN_TICKS_PER_CANDLE {
        return Err(SimulationError::invalid_configuration(format!(
            "tick count {n} is below the minimum of {MIN_TICKS_PER_CANDLE}"
        )));
    }

    let extremes = index::sample(rng, n - 2, 2);
    let (mut low_at, mut high_at) = (extremes.index(0) + 1, extremes.index(1) + 1);
    if rng.random_bool(0.5) {
        std::mem::swap(&mut low_at, &mut high_at);
    }

    let range = candle.range();
    let mut ticks = Vec::with_capacity(n);
    ticks.push(candle.open);
    for i in 1..n - 1 {
        let price = if i == low_at {
            candle.low
        } else if i == high_at {
            candle.high
        } else {
            let unit = Decimal::new(rng.random_range(1..UNIT_SCALE), UNIT_DP);
            candle.low + range * unit
        };
        ticks.push(price);
    }
    ticks.push(candle.close);

    Ok(ticks)
}

/// Tick synthesizer owning its random source.
#[derive(Debug, Clone)]
pub struct TickSynthesizer {
    rng: StdRng,
}

impl TickSynthesizer {
    /// Create a synthesizer seeded from the OS.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a reproducible synthesizer.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Synthesize `n` prices for `candle`.
    ///
    /// # Errors
    ///
    /// See [`synthesize_ticks`].
    pub fn synthesize(&mut self, candle: &Candle, n: usize) -> Result<Vec<Decimal>, SimulationError> {
        synthesize_ticks(candle, n, &mut self.rng)
    }
}

impl Default for TickSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}
