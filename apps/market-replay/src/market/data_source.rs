//! Candle data sources.
//!
//! Historical retrieval is an external collaborator: given a ticker and an
//! interval it returns an ordered candle sequence or fails. Fetching may block
//! for a long time, so callers run it off the tick path (see
//! [`SimulationDriver`](crate::simulation::SimulationDriver)).

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{Candle, CandleInterval};
use crate::error::DataSourceError;

/// Source of historical candles.
#[async_trait]
pub trait CandleDataSource: Send + Sync {
    /// Fetch candles for a ticker, ordered by timestamp.
    ///
    /// # Errors
    ///
    /// Returns a `DataSourceError` if the ticker is unknown or the source is
    /// unavailable.
    async fn fetch_candles(
        &self,
        ticker: &str,
        interval: CandleInterval,
    ) -> Result<Vec<Candle>, DataSourceError>;

    /// Name of this data source.
    fn name(&self) -> &'static str;
}

/// In-memory data source for testing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDataSource {
    data: HashMap<(String, CandleInterval), Vec<Candle>>,
}

impl InMemoryDataSource {
    /// Create a new empty in-memory data source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add candles for a ticker at an interval.
    pub fn add_candles(&mut self, ticker: &str, interval: CandleInterval, candles: Vec<Candle>) {
        self.data.insert((ticker.to_uppercase(), interval), candles);
    }

    /// Builder form of [`add_candles`](Self::add_candles).
    #[must_use]
    pub fn with_candles(
        mut self,
        ticker: &str,
        interval: CandleInterval,
        candles: Vec<Candle>,
    ) -> Self {
        self.add_candles(ticker, interval, candles);
        self
    }
}

#[async_trait]
impl CandleDataSource for InMemoryDataSource {
    async fn fetch_candles(
        &self,
        ticker: &str,
        interval: CandleInterval,
    ) -> Result<Vec<Candle>, DataSourceError> {
        let mut candles = self
            .data
            .get(&(ticker.to_uppercase(), interval))
            .cloned()
            .ok_or_else(|| DataSourceError::NoData {
                ticker: ticker.to_string(),
            })?;
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }

    fn name(&self) -> &'static str {
        "InMemory"
    }
}

/// Reads `<dir>/<TICKER>_<interval>.json`, falling back to `<dir>/<TICKER>.json`.
///
/// Each file holds a JSON array of candles.
#[derive(Debug, Clone)]
pub struct JsonFileDataSource {
    dir: PathBuf,
}

impl JsonFileDataSource {
    /// Create a data source rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, ticker: &str, interval: CandleInterval) -> [PathBuf; 2] {
        let ticker = ticker.to_uppercase();
        [
            self.dir.join(format!("{ticker}_{interval}.json")),
            self.dir.join(format!("{ticker}.json")),
        ]
    }
}

#[async_trait]
impl CandleDataSource for JsonFileDataSource {
    async fn fetch_candles(
        &self,
        ticker: &str,
        interval: CandleInterval,
    ) -> Result<Vec<Candle>, DataSourceError> {
        for path in self.candidates(ticker, interval) {
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(DataSourceError::Unavailable {
                        ticker: ticker.to_string(),
                        message: format!("{}: {e}", path.display()),
                    });
                }
            };

            let mut candles: Vec<Candle> =
                serde_json::from_str(&contents).map_err(|e| DataSourceError::Malformed {
                    ticker: ticker.to_string(),
                    message: format!("{}: {e}", path.display()),
                })?;
            candles.sort_by_key(|c| c.timestamp);

            debug!(
                path = %path.display(),
                candles = candles.len(),
                "Read candle file"
            );
            return Ok(candles);
        }

        Err(DataSourceError::NoData {
            ticker: ticker.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "JsonFile"
    }
}
