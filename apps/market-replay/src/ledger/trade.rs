//! Stateless trade calculators: limit-hit detection and PnL.
//!
//! Long and short share one formula, `(price - entry) * quantity * sign`, with
//! the sign taken from [`Direction`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::Position;

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Profits when price rises.
    Long,
    /// Profits when price falls.
    Short,
}

impl Direction {
    /// `+1` for long, `-1` for short.
    #[must_use]
    pub const fn sign(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether a position's protective exit has been reached.
///
/// This is a stop, not a take-profit:
/// - Long: hit when `price <= limit` (price fell to the floor).
/// - Short: hit when `price >= limit` (price rose to the ceiling).
///
/// Positions without a limit are never hit.
#[must_use]
pub fn is_limit_hit(position: &Position, current_price: Decimal) -> bool {
    position
        .limit_price
        .is_some_and(|limit| (current_price - limit) * position.direction.sign() <= Decimal::ZERO)
}

/// PnL of closing `position` at `exit_price`, saturating at the
/// representable range.
#[must_use]
pub fn realized_pnl(position: &Position, exit_price: Decimal) -> Decimal {
    pnl_at(position, exit_price)
}

/// Mark-to-market PnL of `position` at `current_price`, saturating at the
/// representable range.
#[must_use]
pub fn unrealized_pnl(position: &Position, current_price: Decimal) -> Decimal {
    pnl_at(position, current_price)
}

/// PnL at `price`, or `None` if it is not representable.
pub(crate) fn checked_pnl(position: &Position, price: Decimal) -> Option<Decimal> {
    (price - position.entry_price)
        .checked_mul(position.quantity)
        .map(|pnl| pnl * position.direction.sign())
}

fn pnl_at(position: &Position, price: Decimal) -> Decimal {
    (price - position.entry_price).saturating_mul(position.quantity) * position.direction.sign()
}
