//! Paper-trading ledger: positions, trade records and the account.
//!
//! - [`is_limit_hit`], [`realized_pnl`], [`unrealized_pnl`]: stateless calculators
//! - [`Account`]: cash, positions, peak equity and drawdown

mod account;
mod position;
mod summary;
mod trade;

pub use account::Account;
pub use position::{ExitReason, Position, TradeRecord};
pub use summary::AccountSummary;
pub use trade::{Direction, is_limit_hit, realized_pnl, unrealized_pnl};
