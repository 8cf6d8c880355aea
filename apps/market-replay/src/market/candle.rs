//! OHLC candle data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// One OHLC bar over a fixed historical interval.
///
/// Produced once by a [`CandleDataSource`](super::CandleDataSource) and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time.
    pub timestamp: DateTime<Utc>,
    /// Candle open price.
    pub open: Decimal,
    /// Candle high price.
    pub high: Decimal,
    /// Candle low price.
    pub low: Decimal,
    /// Candle close price.
    pub close: Decimal,
    /// Traded volume (zero when the source does not report it).
    #[serde(default)]
    pub volume: Decimal,
}

impl Candle {
    /// Create a new candle.
    #[must_use]
    pub const fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: Decimal::ZERO,
        }
    }

    /// Set the traded volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = volume;
        self
    }

    /// Price range covered by the candle.
    #[must_use]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Check if a price lies within `[low, high]`.
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.low && price <= self.high
    }

    /// Validate `0 <= low <= min(open, close) <= max(open, close) <= high`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCandle` naming the first violated bound.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let violation = if self.high < self.low {
            Some(format!("high {} below low {}", self.high, self.low))
        } else if self.low < Decimal::ZERO {
            Some(format!("negative low {}", self.low))
        } else if !self.contains(self.open) {
            Some(format!(
                "open {} outside [{}, {}]",
                self.open, self.low, self.high
            ))
        } else if !self.contains(self.close) {
            Some(format!(
                "close {} outside [{}, {}]",
                self.close, self.low, self.high
            ))
        } else {
            None
        };

        match violation {
            Some(message) => Err(SimulationError::InvalidCandle {
                timestamp: self.timestamp.to_rfc3339(),
                message,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::ErrorKind;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_valid_candle() {
        let candle = Candle::new(at(), dec!(100), dec!(110), dec!(90), dec!(105));
        assert!(candle.validate().is_ok());
        assert_eq!(candle.range(), dec!(20));
    }

    #[test]
    fn test_flat_candle_is_valid() {
        let candle = Candle::new(at(), dec!(50), dec!(50), dec!(50), dec!(50));
        assert!(candle.validate().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let candle = Candle::new(at(), dec!(100), dec!(90), dec!(110), dec!(105));
        let err = candle.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCandle);
        assert!(err.to_string().contains("high 90 below low 110"));
    }

    #[test]
    fn test_open_outside_range_rejected() {
        let candle = Candle::new(at(), dec!(120), dec!(110), dec!(90), dec!(105));
        assert!(candle.validate().is_err());
    }

    #[test]
    fn test_close_outside_range_rejected() {
        let candle = Candle::new(at(), dec!(100), dec!(110), dec!(90), dec!(85));
        assert!(candle.validate().is_err());
    }

    #[test]
    fn test_negative_low_rejected() {
        let candle = Candle::new(at(), dec!(1), dec!(2), dec!(-1), dec!(1));
        assert!(candle.validate().is_err());
    }

    #[test]
    fn test_deserialize_numeric_prices() {
        let json = r#"{"timestamp":"2024-03-01T14:30:00Z","open":100,"high":110.5,"low":90,"close":"105.25"}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.high, dec!(110.5));
        assert_eq!(candle.close, dec!(105.25));
        assert_eq!(candle.volume, Decimal::ZERO);
        assert_eq!(candle.timestamp, at());
    }
}
