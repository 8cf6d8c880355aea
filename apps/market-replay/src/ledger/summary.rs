//! Account performance summary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::Account;

/// Aggregate statistics over an account's closed trades.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Number of closed trades.
    pub total_trades: u64,
    /// Trades with positive realized PnL.
    pub winning_trades: u64,
    /// Trades with negative realized PnL.
    pub losing_trades: u64,
    /// `winning_trades / total_trades`.
    pub win_rate: Decimal,
    /// Sum of realized PnL.
    pub realized_pnl: Decimal,
    /// Largest single-trade gain.
    pub largest_win: Decimal,
    /// Largest single-trade loss (as a negative number).
    pub largest_loss: Decimal,
    /// Highest equity observed.
    pub peak_equity: Decimal,
    /// Largest drawdown observed.
    pub max_drawdown: Decimal,
    /// Cash at the time of the summary.
    pub cash_balance: Decimal,
}

impl AccountSummary {
    pub(super) fn from_account(account: &Account) -> Self {
        let trades = account.closed_trades();
        let total_trades = trades.len() as u64;
        let winning_trades = trades.iter().filter(|t| t.is_winner()).count() as u64;
        let losing_trades = trades
            .iter()
            .filter(|t| t.realized_pnl < Decimal::ZERO)
            .count() as u64;

        let win_rate = if total_trades > 0 {
            Decimal::from(winning_trades) / Decimal::from(total_trades)
        } else {
            Decimal::ZERO
        };

        let largest_win = trades
            .iter()
            .map(|t| t.realized_pnl)
            .filter(|pnl| *pnl > Decimal::ZERO)
            .max()
            .unwrap_or(Decimal::ZERO);
        let largest_loss = trades
            .iter()
            .map(|t| t.realized_pnl)
            .filter(|pnl| *pnl < Decimal::ZERO)
            .min()
            .unwrap_or(Decimal::ZERO);

        Self {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            realized_pnl: account.realized_pnl(),
            largest_win,
            largest_loss,
            peak_equity: account.peak_equity(),
            max_drawdown: account.max_drawdown(),
            cash_balance: account.cash_balance(),
        }
    }
}
