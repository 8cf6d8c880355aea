//! Error handling for the replay core.
//!
//! Every failure carries an [`ErrorKind`] tag plus enough context (ticker,
//! attempted value) for a caller to act on it. Nothing is retried internally.
//!
//! | Kind | Scope | Recoverable |
//! |------|-------|-------------|
//! | `INVALID_CONFIGURATION` | setup / tick count | retry with corrected input |
//! | `INVALID_CANDLE` | load | no, the load is rejected |
//! | `DATA_SOURCE_ERROR` | load | retry is the data source's concern |
//! | `SIMULATION_ENDED` | advance | no, re-load required |
//! | `SIMULATION_FAILED` | advance | no, re-load required |
//! | `INSUFFICIENT_FUNDS` | ledger | yes |
//! | `INVALID_AMOUNT` | ledger | yes |
//! | `POSITION_NOT_FOUND` | ledger | yes |
//! | `NO_PRICE` | trading before the first tick | yes |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error-kind tag attached to every failure and terminal notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad speed, balance, ticker or tick count.
    InvalidConfiguration,
    /// Malformed OHLC data.
    InvalidCandle,
    /// Historical fetch failed or returned nothing.
    DataSourceError,
    /// Clock has replayed every candle.
    SimulationEnded,
    /// Clock is in the failed state (or was never loaded).
    SimulationFailed,
    /// Requested cash exceeds the balance.
    InsufficientFunds,
    /// Non-positive or too-small amount.
    InvalidAmount,
    /// Position is not open.
    PositionNotFound,
    /// No tick has been emitted yet, so there is nothing to trade at.
    NoPrice,
}

impl ErrorKind {
    /// Get the reason string for this kind.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration => "INVALID_CONFIGURATION",
            Self::InvalidCandle => "INVALID_CANDLE",
            Self::DataSourceError => "DATA_SOURCE_ERROR",
            Self::SimulationEnded => "SIMULATION_ENDED",
            Self::SimulationFailed => "SIMULATION_FAILED",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::PositionNotFound => "POSITION_NOT_FOUND",
            Self::NoPrice => "NO_PRICE",
        }
    }

    /// Ledger-level errors leave the account untouched and may be retried.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds | Self::InvalidAmount | Self::PositionNotFound | Self::NoPrice
        )
    }

    /// Terminal clock conditions: stop calling `advance()`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::SimulationEnded | Self::SimulationFailed)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Failure reported by a candle data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataSourceError {
    /// No candles exist for the ticker.
    #[error("no candle data for {ticker}")]
    NoData {
        /// Requested ticker.
        ticker: String,
    },

    /// The source could not be read.
    #[error("candle source unavailable for {ticker}: {message}")]
    Unavailable {
        /// Requested ticker.
        ticker: String,
        /// Underlying error.
        message: String,
    },

    /// The payload could not be decoded.
    #[error("malformed candle payload for {ticker}: {message}")]
    Malformed {
        /// Requested ticker.
        ticker: String,
        /// Decoder error.
        message: String,
    },

    /// The fetch task was cancelled before completing.
    #[error("candle fetch for {ticker} was cancelled")]
    Cancelled {
        /// Requested ticker.
        ticker: String,
    },
}

/// Errors raised by the synthesizer, clock, ledger and controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// Setup input rejected.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong.
        message: String,
    },

    /// Candle violates OHLC bounds.
    #[error("invalid candle at {timestamp}: {message}")]
    InvalidCandle {
        /// Candle timestamp (RFC 3339).
        timestamp: String,
        /// Violated bound.
        message: String,
    },

    /// Historical data could not be loaded.
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// Every candle has been replayed.
    #[error("simulation ended for {ticker} after {candles} candles")]
    SimulationEnded {
        /// Active ticker.
        ticker: String,
        /// Number of candles replayed.
        candles: usize,
    },

    /// The clock is unusable until reloaded.
    #[error("simulation failed for {ticker}: {reason}")]
    SimulationFailed {
        /// Active ticker.
        ticker: String,
        /// Why the clock failed.
        reason: String,
    },

    /// Not enough cash for the requested amount.
    #[error("insufficient funds for {ticker}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Ticker being traded.
        ticker: String,
        /// Requested cash amount.
        requested: Decimal,
        /// Cash balance at the time of the request.
        available: Decimal,
    },

    /// Amount or price is not usable.
    #[error("invalid amount for {ticker}: {amount} ({message})")]
    InvalidAmount {
        /// Ticker being traded.
        ticker: String,
        /// Attempted amount.
        amount: Decimal,
        /// Why it was rejected.
        message: String,
    },

    /// No open position with this ID.
    #[error("position not found: {position_id}")]
    PositionNotFound {
        /// Position ID.
        position_id: Uuid,
    },

    /// Trading requested before any price was emitted.
    #[error("no price emitted yet for {ticker}")]
    NoPrice {
        /// Active ticker.
        ticker: String,
    },
}

impl SimulationError {
    /// Build an `InvalidConfiguration` error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Get the error-kind tag.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            Self::InvalidCandle { .. } => ErrorKind::InvalidCandle,
            Self::DataSource(_) => ErrorKind::DataSourceError,
            Self::SimulationEnded { .. } => ErrorKind::SimulationEnded,
            Self::SimulationFailed { .. } => ErrorKind::SimulationFailed,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::PositionNotFound { .. } => ErrorKind::PositionNotFound,
            Self::NoPrice { .. } => ErrorKind::NoPrice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = SimulationError::invalid_configuration("speed 7");
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

        let err = SimulationError::from(DataSourceError::NoData {
            ticker: "AAPL".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::DataSourceError);
        assert!(err.to_string().contains("AAPL"));
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(ErrorKind::InsufficientFunds.is_recoverable());
        assert!(ErrorKind::InvalidAmount.is_recoverable());
        assert!(ErrorKind::PositionNotFound.is_recoverable());
        assert!(ErrorKind::NoPrice.is_recoverable());
        assert!(!ErrorKind::SimulationEnded.is_recoverable());
        assert!(!ErrorKind::InvalidCandle.is_recoverable());
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(ErrorKind::SimulationEnded.is_terminal());
        assert!(ErrorKind::SimulationFailed.is_terminal());
        assert!(!ErrorKind::DataSourceError.is_terminal());
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::PositionNotFound).unwrap();
        assert_eq!(json, "\"POSITION_NOT_FOUND\"");
        assert_eq!(ErrorKind::SimulationEnded.to_string(), "SIMULATION_ENDED");
    }

    #[test]
    fn test_insufficient_funds_message_has_context() {
        let err = SimulationError::InsufficientFunds {
            ticker: "MSFT".to_string(),
            requested: Decimal::new(5000, 0),
            available: Decimal::new(100, 0),
        };
        let msg = err.to_string();
        assert!(msg.contains("MSFT"));
        assert!(msg.contains("5000"));
        assert!(msg.contains("100"));
    }
}
