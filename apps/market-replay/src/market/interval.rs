//! Candle interval requested from a data source.

use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Bar width of the historical candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CandleInterval {
    /// One minute.
    #[serde(rename = "1m")]
    OneMinute,
    /// Five minutes.
    #[serde(rename = "5m")]
    FiveMinutes,
    /// Fifteen minutes.
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// One hour.
    #[serde(rename = "1h")]
    OneHour,
    /// One trading day.
    #[default]
    #[serde(rename = "1d")]
    OneDay,
}

impl CandleInterval {
    /// Short code used in configs and file names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }

    /// Nominal bar duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Self::OneMinute => Duration::minutes(1),
            Self::FiveMinutes => Duration::minutes(5),
            Self::FifteenMinutes => Duration::minutes(15),
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::days(1),
        }
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandleInterval {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            "1d" => Ok(Self::OneDay),
            other => Err(SimulationError::invalid_configuration(format!(
                "unknown candle interval '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for interval in [
            CandleInterval::OneMinute,
            CandleInterval::FiveMinutes,
            CandleInterval::FifteenMinutes,
            CandleInterval::OneHour,
            CandleInterval::OneDay,
        ] {
            assert_eq!(interval.as_str().parse::<CandleInterval>().unwrap(), interval);
        }
    }

    #[test]
    fn test_unknown_interval() {
        assert!("2w".parse::<CandleInterval>().is_err());
    }

    #[test]
    fn test_serde_uses_short_code() {
        let json = serde_json::to_string(&CandleInterval::OneHour).unwrap();
        assert_eq!(json, "\"1h\"");
        let parsed: CandleInterval = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(parsed, CandleInterval::FifteenMinutes);
    }

    #[test]
    fn test_duration() {
        assert_eq!(CandleInterval::OneDay.duration(), Duration::hours(24));
        assert_eq!(CandleInterval::default(), CandleInterval::OneDay);
    }
}
