//! Historical market data: candles, intervals and the data-source port.

mod candle;
mod data_source;
mod interval;

pub use candle::Candle;
pub use data_source::{CandleDataSource, InMemoryDataSource, JsonFileDataSource};
pub use interval::CandleInterval;
