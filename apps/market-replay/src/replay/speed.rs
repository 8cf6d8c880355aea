//! Playback speed and tick density.

use serde::{Deserialize, Serialize};

use super::synthesizer::MIN_TICKS_PER_CANDLE;
use crate::error::SimulationError;

/// Accepted speed multipliers.
pub const VALID_SPEEDS: [u32; 6] = [5, 10, 15, 20, 25, 30];

/// Default tick budget divided by the speed to get ticks per candle.
pub const DEFAULT_TICK_BUDGET: usize = 300;

/// Validated playback speed multiplier.
///
/// Higher speed means fewer synthesized points per candle:
/// `ticks_per_candle = max(MIN_TICKS_PER_CANDLE, tick_budget / speed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PlaybackSpeed(u32);

impl PlaybackSpeed {
    /// Validate a speed multiplier.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless `multiplier` is one of [`VALID_SPEEDS`].
    pub fn new(multiplier: u32) -> Result<Self, SimulationError> {
        if VALID_SPEEDS.contains(&multiplier) {
            Ok(Self(multiplier))
        } else {
            Err(SimulationError::invalid_configuration(format!(
                "speed {multiplier} is not one of {VALID_SPEEDS:?}"
            )))
        }
    }

    /// Raw multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> u32 {
        self.0
    }

    /// Ticks synthesized per candle at this speed.
    #[must_use]
    pub fn ticks_per_candle(&self, tick_budget: usize) -> usize {
        (tick_budget / self.0 as usize).max(MIN_TICKS_PER_CANDLE)
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self(VALID_SPEEDS[0])
    }
}

impl TryFrom<u32> for PlaybackSpeed {
    type Error = SimulationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlaybackSpeed> for u32 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.0
    }
}

impl std::fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.0)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::error::ErrorKind;

    #[test_case(5, 60)]
    #[test_case(10, 30)]
    #[test_case(15, 20)]
    #[test_case(20, 15)]
    #[test_case(25, 12)]
    #[test_case(30, 10)]
    fn test_ticks_per_candle_default_budget(speed: u32, expected: usize) {
        let speed = PlaybackSpeed::new(speed).unwrap();
        assert_eq!(speed.ticks_per_candle(DEFAULT_TICK_BUDGET), expected);
    }

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(7)]
    #[test_case(35)]
    #[test_case(100)]
    fn test_invalid_speed(speed: u32) {
        let err = PlaybackSpeed::new(speed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_ticks_per_candle_is_decreasing() {
        let counts: Vec<usize> = VALID_SPEEDS
            .iter()
            .map(|s| PlaybackSpeed::new(*s).unwrap().ticks_per_candle(DEFAULT_TICK_BUDGET))
            .collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_small_budget_clamps_to_minimum() {
        let speed = PlaybackSpeed::new(30).unwrap();
        assert_eq!(speed.ticks_per_candle(10), MIN_TICKS_PER_CANDLE);
        assert_eq!(speed.ticks_per_candle(0), MIN_TICKS_PER_CANDLE);
    }

    #[test]
    fn test_serde_validates() {
        let speed: PlaybackSpeed = serde_json::from_str("15").unwrap();
        assert_eq!(speed.multiplier(), 15);
        assert!(serde_json::from_str::<PlaybackSpeed>("12").is_err());
        assert_eq!(speed.to_string(), "15x");
    }
}
