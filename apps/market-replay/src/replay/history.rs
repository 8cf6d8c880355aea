//! Emitted price history.
//!
//! The clock appends to a [`PriceLog`]; every snapshot carries a
//! [`PriceHistory`] view fixed at the length it had when the tick was emitted.
//! Views share the log's buffer, so handing one out per tick is O(1). Earlier
//! entries are never rewritten, and a reload starts a fresh buffer, so a view
//! always sees the same prices.

use std::sync::{Arc, PoisonError, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

type Buffer = Arc<RwLock<Vec<Decimal>>>;

/// Append-only price log owned by the clock.
#[derive(Debug, Default)]
pub(crate) struct PriceLog {
    prices: Buffer,
}

impl PriceLog {
    pub(crate) fn push(&mut self, price: Decimal) {
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(price);
    }

    pub(crate) fn len(&self) -> usize {
        self.prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn view(&self) -> PriceHistory {
        PriceHistory {
            len: self.len(),
            prices: Arc::clone(&self.prices),
        }
    }
}

/// Prices emitted up to one tick, oldest first.
#[derive(Clone)]
pub struct PriceHistory {
    prices: Buffer,
    len: usize,
}

impl PriceHistory {
    /// Number of prices in this view.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if no price had been emitted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recent price in this view.
    #[must_use]
    pub fn last(&self) -> Option<Decimal> {
        self.with_prices(|prices| prices.last().copied())
    }

    /// Run `f` over the prices in this view.
    pub fn with_prices<R>(&self, f: impl FnOnce(&[Decimal]) -> R) -> R {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        f(&prices[..self.len.min(prices.len())])
    }

    /// Copy the prices out.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Decimal> {
        self.with_prices(<[Decimal]>::to_vec)
    }
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl From<Vec<Decimal>> for PriceHistory {
    fn from(prices: Vec<Decimal>) -> Self {
        Self {
            len: prices.len(),
            prices: Arc::new(RwLock::new(prices)),
        }
    }
}

impl std::fmt::Debug for PriceHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with_prices(|prices| f.debug_list().entries(prices).finish())
    }
}

impl PartialEq for PriceHistory {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.with_prices(|a| other.with_prices(|b| a == b))
    }
}

impl Eq for PriceHistory {}

impl Serialize for PriceHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.with_prices(|prices| prices.serialize(serializer))
    }
}

impl<'de> Deserialize<'de> for PriceHistory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Decimal>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_view_is_fixed_at_its_length() {
        let mut log = PriceLog::default();
        log.push(dec!(100));
        let first = log.view();
        log.push(dec!(101));
        log.push(dec!(102));
        let third = log.view();

        assert_eq!(first.to_vec(), vec![dec!(100)]);
        assert_eq!(first.last(), Some(dec!(100)));
        assert_eq!(third.len(), 3);
        assert_eq!(third.last(), Some(dec!(102)));
    }

    #[test]
    fn test_views_share_one_buffer() {
        let mut log = PriceLog::default();
        for i in 0..1000 {
            log.push(Decimal::from(i));
        }
        let a = log.view();
        let b = log.view();
        assert!(Arc::ptr_eq(&a.prices, &b.prices));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fresh_log_leaves_old_views_intact() {
        let mut log = PriceLog::default();
        log.push(dec!(1));
        let old = log.view();

        log = PriceLog::default();
        log.push(dec!(9));

        assert_eq!(old.to_vec(), vec![dec!(1)]);
        assert_eq!(log.view().to_vec(), vec![dec!(9)]);
    }

    #[test]
    fn test_serializes_as_list() {
        let history = PriceHistory::from(vec![dec!(1.5), dec!(2)]);
        let json = serde_json::to_string(&history).unwrap();
        let back: PriceHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
        assert!(PriceHistory::default().is_empty());
    }
}
