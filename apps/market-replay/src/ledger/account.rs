//! Paper-trading account.
//!
//! Cash is debited by the cost basis when a position opens and credited with
//! `cost basis + realized PnL` when it closes, so open positions are already
//! "paid for". Equity is therefore `cash + Σ unrealized PnL`, never
//! `cash + market value`.
//!
//! Quantity policy: whole shares only. `quantity = floor(amount / price)` and
//! the cash debited is `quantity * price`, which may be less than the amount
//! requested.
//!
//! Every fallible operation validates before mutating: a rejected call leaves
//! the account exactly as it was. Amounts that overflow `Decimal` are rejected
//! with `InvalidAmount`; equity and ratios saturate instead.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::position::{ExitReason, Position, TradeRecord};
use super::summary::AccountSummary;
use super::trade::{Direction, checked_pnl, unrealized_pnl};
use crate::error::SimulationError;

/// Cash, open positions, realized history and drawdown tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    initial_balance: Decimal,
    cash_balance: Decimal,
    open_positions: Vec<Position>,
    closed_trades: Vec<TradeRecord>,
    peak_equity: Decimal,
    max_drawdown: Decimal,
}

impl Account {
    /// Create an account funded with `initial_balance`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the balance is not positive.
    pub fn new(initial_balance: Decimal) -> Result<Self, SimulationError> {
        if initial_balance <= Decimal::ZERO {
            return Err(SimulationError::invalid_configuration(format!(
                "initial balance must be positive, got {initial_balance}"
            )));
        }

        Ok(Self {
            initial_balance,
            cash_balance: initial_balance,
            open_positions: Vec::new(),
            closed_trades: Vec::new(),
            peak_equity: initial_balance,
            max_drawdown: Decimal::ZERO,
        })
    }

    /// Open a position spending up to `amount_in_cash` at `current_price`.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount, price or limit is not positive, the
    ///   amount buys less than one share, or the quantity is not representable.
    /// - `InsufficientFunds` if the amount exceeds the cash balance.
    pub fn open_position(
        &mut self,
        ticker: &str,
        direction: Direction,
        amount_in_cash: Decimal,
        current_price: Decimal,
        limit_price: Option<Decimal>,
        entry_time: DateTime<Utc>,
    ) -> Result<Position, SimulationError> {
        let invalid = |message: String| SimulationError::InvalidAmount {
            ticker: ticker.to_string(),
            amount: amount_in_cash,
            message,
        };

        if amount_in_cash <= Decimal::ZERO {
            return Err(invalid("amount must be positive".to_string()));
        }
        if amount_in_cash > self.cash_balance {
            return Err(SimulationError::InsufficientFunds {
                ticker: ticker.to_string(),
                requested: amount_in_cash,
                available: self.cash_balance,
            });
        }
        if current_price <= Decimal::ZERO {
            return Err(invalid(format!("price {current_price} is not positive")));
        }
        if let Some(limit) = limit_price
            && limit <= Decimal::ZERO
        {
            return Err(invalid(format!("limit {limit} is not positive")));
        }

        let Some(quantity) = amount_in_cash.checked_div(current_price).map(|q| q.floor()) else {
            return Err(invalid(format!(
                "quantity at {current_price} is out of range"
            )));
        };
        if quantity <= Decimal::ZERO {
            return Err(invalid(format!(
                "amount buys less than one share at {current_price}"
            )));
        }
        let Some(cost) = quantity.checked_mul(current_price) else {
            return Err(invalid(format!(
                "cost of {quantity} at {current_price} is out of range"
            )));
        };

        let position = Position {
            id: Uuid::new_v4(),
            ticker: ticker.to_string(),
            direction,
            quantity,
            entry_price: current_price,
            limit_price,
            entry_time,
        };

        self.cash_balance -= cost;
        self.open_positions.push(position.clone());

        info!(
            position_id = %position.id,
            ticker = %ticker,
            direction = %direction,
            quantity = %quantity,
            price = %current_price,
            cash = %self.cash_balance,
            "Position opened"
        );

        Ok(position)
    }

    /// Close an open position at `exit_price`.
    ///
    /// # Errors
    ///
    /// - `PositionNotFound` if no open position has this ID.
    /// - `InvalidAmount` if the PnL or the resulting cash is not representable;
    ///   the position stays open.
    pub fn close_position(
        &mut self,
        position_id: Uuid,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        exit_reason: ExitReason,
    ) -> Result<TradeRecord, SimulationError> {
        let idx = self
            .open_positions
            .iter()
            .position(|p| p.id == position_id)
            .ok_or(SimulationError::PositionNotFound { position_id })?;

        let position = &self.open_positions[idx];
        let settled = checked_pnl(position, exit_price).and_then(|pnl| {
            position
                .cost_basis()
                .checked_add(pnl)
                .and_then(|credit| self.cash_balance.checked_add(credit))
                .map(|cash| (pnl, cash))
        });
        let Some((pnl, cash)) = settled else {
            return Err(SimulationError::InvalidAmount {
                ticker: position.ticker.clone(),
                amount: exit_price,
                message: format!("settling at {exit_price} is out of range"),
            });
        };

        let position = self.open_positions.remove(idx);
        self.cash_balance = cash;

        let record = TradeRecord {
            position_id,
            ticker: position.ticker,
            direction: position.direction,
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price,
            realized_pnl: pnl,
            entry_time: position.entry_time,
            exit_time,
            exit_reason,
        };

        info!(
            position_id = %position_id,
            ticker = %record.ticker,
            exit_price = %exit_price,
            realized_pnl = %pnl,
            reason = ?exit_reason,
            cash = %self.cash_balance,
            "Position closed"
        );

        self.closed_trades.push(record.clone());
        Ok(record)
    }

    /// Mark-to-market equity: `cash + Σ unrealized PnL`.
    ///
    /// Positions whose ticker has no price in `price_of` are marked at entry
    /// (zero unrealized PnL).
    pub fn total_equity<F>(&self, price_of: F) -> Decimal
    where
        F: Fn(&str) -> Option<Decimal>,
    {
        self.open_positions
            .iter()
            .map(|p| price_of(&p.ticker).map_or(Decimal::ZERO, |px| unrealized_pnl(p, px)))
            .fold(self.cash_balance, Decimal::saturating_add)
    }

    /// Record an equity observation and return the current drawdown.
    ///
    /// The peak never decreases. Drawdown is `(peak - equity) / peak`, or zero
    /// when the peak is not positive.
    pub fn update_peak_and_drawdown(&mut self, equity: Decimal) -> Decimal {
        self.peak_equity = self.peak_equity.max(equity);
        let drawdown = if self.peak_equity > Decimal::ZERO {
            self.peak_equity
                .saturating_sub(equity)
                .checked_div(self.peak_equity)
                .unwrap_or(Decimal::MAX)
        } else {
            Decimal::ZERO
        };
        self.max_drawdown = self.max_drawdown.max(drawdown);
        drawdown
    }

    /// Return relative to the initial balance.
    #[must_use]
    pub fn total_return_rate(&self, equity: Decimal) -> Decimal {
        let gain = equity.saturating_sub(self.initial_balance);
        gain.checked_div(self.initial_balance)
            .unwrap_or(if gain < Decimal::ZERO { Decimal::MIN } else { Decimal::MAX })
    }

    /// Aggregate statistics over closed trades.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary::from_account(self)
    }

    /// Starting balance.
    #[must_use]
    pub const fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    /// Uncommitted cash.
    #[must_use]
    pub const fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    /// Highest equity observed (at least the initial balance).
    #[must_use]
    pub const fn peak_equity(&self) -> Decimal {
        self.peak_equity
    }

    /// Largest drawdown observed.
    #[must_use]
    pub const fn max_drawdown(&self) -> Decimal {
        self.max_drawdown
    }

    /// Open positions in opening order.
    #[must_use]
    pub fn open_positions(&self) -> &[Position] {
        &self.open_positions
    }

    /// Look up an open position.
    #[must_use]
    pub fn position(&self, position_id: Uuid) -> Option<&Position> {
        self.open_positions.iter().find(|p| p.id == position_id)
    }

    /// Open positions on `ticker`.
    pub fn positions_for<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a Position> + 'a {
        self.open_positions.iter().filter(move |p| p.ticker == ticker)
    }

    /// Closed trades in closing order.
    #[must_use]
    pub fn closed_trades(&self) -> &[TradeRecord] {
        &self.closed_trades
    }

    /// Sum of realized PnL across closed trades.
    #[must_use]
    pub fn realized_pnl(&self) -> Decimal {
        self.closed_trades
            .iter()
            .map(|t| t.realized_pnl)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}
