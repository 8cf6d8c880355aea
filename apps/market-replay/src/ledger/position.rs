//! Open positions and closed trade records.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::trade::Direction;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// Protective limit reached during replay.
    Limit,
    /// Closed on user request.
    Manual,
}

impl ExitReason {
    /// Get the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Manual => "MANUAL",
        }
    }
}

/// An open position owned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Position ID.
    pub id: Uuid,
    /// Ticker traded.
    pub ticker: String,
    /// Long or short.
    pub direction: Direction,
    /// Whole shares, always positive.
    pub quantity: Decimal,
    /// Fill price at entry.
    pub entry_price: Decimal,
    /// Protective exit level.
    pub limit_price: Option<Decimal>,
    /// Simulated entry time.
    pub entry_time: DateTime<Utc>,
}

impl Position {
    /// Cash committed at entry.
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.entry_price
    }
}

/// Immutable record of a closed position, handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// ID of the closed position.
    pub position_id: Uuid,
    /// Ticker traded.
    pub ticker: String,
    /// Long or short.
    pub direction: Direction,
    /// Shares traded.
    pub quantity: Decimal,
    /// Entry fill price.
    pub entry_price: Decimal,
    /// Exit fill price.
    pub exit_price: Decimal,
    /// Realized profit or loss.
    pub realized_pnl: Decimal,
    /// Simulated entry time.
    pub entry_time: DateTime<Utc>,
    /// Simulated exit time.
    pub exit_time: DateTime<Utc>,
    /// Why it closed.
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    /// Check if this trade was profitable.
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }

    /// Realized PnL as a fraction of the cost basis.
    #[must_use]
    pub fn return_rate(&self) -> Decimal {
        let cost = self.entry_price * self.quantity;
        if cost == Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.realized_pnl / cost
    }

    /// Simulated time the position was held; zero if the clock went backwards.
    #[must_use]
    pub fn holding_period(&self) -> Duration {
        let held = self.exit_time - self.entry_time;
        if held < Duration::zero() {
            Duration::zero()
        } else {
            held
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn record(pnl: Decimal, entry_hour: u32, exit_hour: u32) -> TradeRecord {
        TradeRecord {
            position_id: Uuid::new_v4(),
            ticker: "AAPL".to_string(),
            direction: Direction::Long,
            quantity: dec!(10),
            entry_price: dec!(150),
            exit_price: dec!(160),
            realized_pnl: pnl,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 5, entry_hour, 0, 0).unwrap(),
            exit_time: Utc.with_ymd_and_hms(2024, 1, 5, exit_hour, 0, 0).unwrap(),
            exit_reason: ExitReason::Manual,
        }
    }

    #[test]
    fn test_return_rate() {
        let trade = record(dec!(100), 10, 14);
        assert!(trade.is_winner());
        assert_eq!(trade.return_rate(), dec!(100) / dec!(1500));
    }

    #[test]
    fn test_flat_trade_is_not_winner() {
        assert!(!record(Decimal::ZERO, 10, 11).is_winner());
    }

    #[test]
    fn test_holding_period() {
        assert_eq!(record(dec!(1), 10, 14).holding_period(), Duration::hours(4));
        assert_eq!(record(dec!(1), 14, 10).holding_period(), Duration::zero());
    }

    #[test]
    fn test_cost_basis() {
        let position = Position {
            id: Uuid::new_v4(),
            ticker: "AAPL".to_string(),
            direction: Direction::Short,
            quantity: dec!(7),
            entry_price: dec!(20.5),
            limit_price: None,
            entry_time: Utc::now(),
        };
        assert_eq!(position.cost_basis(), dec!(143.5));
    }
}
