//! Replay metrics.
//!
//! Recorded through the `metrics` facade; they are no-ops until the host
//! installs a recorder.

use metrics::{counter, gauge};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

// ============================================================================
// Clock Metrics
// ============================================================================

/// Record one emitted tick.
pub fn record_tick_emitted(ticker: &str) {
    counter!("replay_ticks_emitted_total", "ticker" => ticker.to_string()).increment(1);
}

/// Record a fully replayed candle.
pub fn record_candle_completed(ticker: &str) {
    counter!("replay_candles_completed_total", "ticker" => ticker.to_string()).increment(1);
}

// ============================================================================
// Ledger Metrics
// ============================================================================

/// Record a closed trade.
///
/// # Arguments
///
/// * `ticker` - Ticker traded
/// * `reason` - Exit reason (e.g., "LIMIT", "MANUAL")
pub fn record_trade_closed(ticker: &str, reason: &str) {
    counter!(
        "replay_trades_closed_total",
        "ticker" => ticker.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Update account gauges after a tick.
pub fn update_account(ticker: &str, equity: Decimal, drawdown: Decimal, open_positions: usize) {
    gauge!("replay_equity", "ticker" => ticker.to_string()).set(equity.to_f64().unwrap_or(0.0));
    gauge!("replay_drawdown", "ticker" => ticker.to_string())
        .set(drawdown.to_f64().unwrap_or(0.0));
    gauge!("replay_open_positions", "ticker" => ticker.to_string()).set(open_positions as f64);
}
