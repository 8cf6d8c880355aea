//! Trade persistence port.
//!
//! Every closed trade is handed to a [`TradeSink`] tagged with the user that
//! owns the simulation. Sink failures are logged by the controller and never
//! roll back the ledger.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::ledger::TradeRecord;

/// Opaque identity attached to persisted trades.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure to persist a trade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// The receiving side has gone away.
    #[error("trade sink closed")]
    Closed,

    /// The backing store rejected the write.
    #[error("trade persistence failed: {0}")]
    Failed(String),
}

/// A closed trade paired with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTrade {
    /// Owner of the simulation.
    pub user: UserId,
    /// The closed trade.
    pub trade: TradeRecord,
}

/// Destination for closed trades.
#[cfg_attr(test, mockall::automock)]
pub trait TradeSink: Send + Sync {
    /// Persist one closed trade.
    fn record_trade(&self, user: &UserId, trade: &TradeRecord) -> Result<(), PersistenceError>;
}

/// Sink that discards every trade.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTradeSink;

impl TradeSink for NoOpTradeSink {
    fn record_trade(&self, _user: &UserId, _trade: &TradeRecord) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Sink that forwards trades to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelTradeSink {
    tx: mpsc::UnboundedSender<PersistedTrade>,
}

impl ChannelTradeSink {
    /// Create a sink and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PersistedTrade>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TradeSink for ChannelTradeSink {
    fn record_trade(&self, user: &UserId, trade: &TradeRecord) -> Result<(), PersistenceError> {
        self.tx
            .send(PersistedTrade {
                user: user.clone(),
                trade: trade.clone(),
            })
            .map_err(|_| PersistenceError::Closed)
    }
}

/// Sink that keeps every trade in memory.
#[derive(Debug, Default)]
pub struct InMemoryTradeSink {
    trades: Mutex<Vec<PersistedTrade>>,
}

impl InMemoryTradeSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn trades(&self) -> Vec<PersistedTrade> {
        self.trades
            .lock()
            .map(|trades| trades.clone())
            .unwrap_or_default()
    }

    /// Number of trades recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.lock().map(|trades| trades.len()).unwrap_or(0)
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TradeSink for InMemoryTradeSink {
    fn record_trade(&self, user: &UserId, trade: &TradeRecord) -> Result<(), PersistenceError> {
        let mut trades = self
            .trades
            .lock()
            .map_err(|e| PersistenceError::Failed(e.to_string()))?;
        trades.push(PersistedTrade {
            user: user.clone(),
            trade: trade.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    use super::*;
    use crate::ledger::{Direction, ExitReason};

    fn trade() -> TradeRecord {
        let now = Utc::now();
        TradeRecord {
            position_id: Uuid::new_v4(),
            ticker: "AAPL".to_string(),
            direction: Direction::Long,
            quantity: dec!(10),
            entry_price: dec!(150),
            exit_price: dec!(160),
            realized_pnl: dec!(100),
            entry_time: now,
            exit_time: now,
            exit_reason: ExitReason::Manual,
        }
    }

    #[test]
    fn test_user_id_display() {
        let user = UserId::new("alice");
        assert_eq!(user.as_str(), "alice");
        assert_eq!(user.to_string(), "alice");
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"alice\"");
    }

    #[test]
    fn test_in_memory_sink_records() {
        let sink = InMemoryTradeSink::new();
        assert!(sink.is_empty());

        sink.record_trade(&UserId::new("alice"), &trade()).unwrap();

        let trades = sink.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].user.as_str(), "alice");
        assert_eq!(trades[0].trade.realized_pnl, dec!(100));
    }

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelTradeSink::new();
        assert_ok!(sink.record_trade(&UserId::new("bob"), &trade()));

        let persisted = rx.recv().await.unwrap();
        assert_eq!(persisted.user, UserId::new("bob"));
        assert_eq!(persisted.trade.ticker, "AAPL");
    }

    #[test]
    fn test_channel_sink_closed() {
        let (sink, rx) = ChannelTradeSink::new();
        drop(rx);

        let err = assert_err!(sink.record_trade(&UserId::new("bob"), &trade()));
        assert_eq!(err, PersistenceError::Closed);
    }

    #[test]
    fn test_noop_sink() {
        assert_ok!(NoOpTradeSink.record_trade(&UserId::new("x"), &trade()));
    }
}
