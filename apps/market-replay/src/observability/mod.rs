//! Observability: tracing subscriber setup and replay metrics.

mod logging;
mod metrics;

pub use logging::{TracingError, build_filter, init_tracing};
pub use self::metrics::{
    record_candle_completed, record_tick_emitted, record_trade_closed, update_account,
};
