use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::side::Side;
use super::target::{ExchangeId, PairId};
use crate::values::{Price, Quantity};

/// A single changed price level, serialised as `[price, size]`.
///
/// A size of zero means the level was removed from the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange(
    #[serde(with = "rust_decimal::serde::float")] pub Price,
    #[serde(with = "rust_decimal::serde::float")] pub Quantity,
);

impl LevelChange {
    pub fn new(price: Price, size: Quantity) -> Self {
        LevelChange(price, size)
    }

    pub fn price(&self) -> Price {
        self.0
    }

    pub fn size(&self) -> Quantity {
        self.1
    }

    pub fn is_removal(&self) -> bool {
        self.1 == Decimal::ZERO
    }
}

/// Incremental order book change for one pair on one exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDelta {
    pub exchange: ExchangeId,
    pub symbol: PairId,
    /// Exchange event time in fractional unix seconds
    pub timestamp: f64,
    pub bid: Vec<LevelChange>,
    pub ask: Vec<LevelChange>,
}

impl BookDelta {
    pub fn new(exchange: impl Into<ExchangeId>, symbol: impl Into<PairId>, timestamp: f64) -> Self {
        BookDelta {
            exchange: exchange.into(),
            symbol: symbol.into(),
            timestamp,
            bid: Vec::new(),
            ask: Vec::new(),
        }
    }

    pub fn with_bids(mut self, bids: Vec<LevelChange>) -> Self {
        self.bid = bids;
        self
    }

    pub fn with_asks(mut self, asks: Vec<LevelChange>) -> Self {
        self.ask = asks;
        self
    }

    pub fn push(&mut self, side: Side, price: Price, size: Quantity) {
        let level = LevelChange::new(price, size);
        match side {
            Side::Bid => self.bid.push(level),
            Side::Ask => self.ask.push(level),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bid.is_empty() && self.ask.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.bid.len() + self.ask.len()
    }
}
