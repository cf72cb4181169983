//! Shared fixtures for the relay integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use book_relay::{
    DeltaSink, FeedConnector, FeedError, FeedHandle, FeedRegistry, Relay, RelayConfig, RelayHandle,
};
use parking_lot::Mutex;
use relay_core::{BookDelta, ExchangeId, LevelChange, PairId, SubscriptionTarget};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A session opened through a manual connector
#[derive(Clone)]
pub struct OpenedSession {
    pub exchange: ExchangeId,
    pub pair: PairId,
    pub sink: DeltaSink,
    open: Arc<AtomicBool>,
}

impl OpenedSession {
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct FeedState {
    sessions: Vec<OpenedSession>,
    rejected_pairs: HashSet<PairId>,
    failing: bool,
}

/// Upstream stand-in driven by the test.
///
/// Every exchange connector created from one `ManualFeed` records into the
/// same log, so tests can assert on the global number of open sessions.
#[derive(Clone, Default)]
pub struct ManualFeed {
    state: Arc<Mutex<FeedState>>,
}

impl ManualFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self, exchange: impl Into<ExchangeId>) -> Arc<dyn FeedConnector> {
        Arc::new(ManualConnector {
            exchange: exchange.into(),
            feed: self.clone(),
        })
    }

    /// Registry serving Kraken and Coinbase through this feed
    pub fn registry(&self) -> FeedRegistry {
        FeedRegistry::new()
            .with("kraken", self.connector("kraken"))
            .with("coinbase", self.connector("coinbase"))
    }

    /// Make subsequent opens for `pair` fail as the exchange would
    pub fn reject_pair(&self, pair: impl Into<PairId>) {
        self.state.lock().rejected_pairs.insert(pair.into());
    }

    /// Make every subsequent open fail with a connection error
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn sessions(&self) -> Vec<OpenedSession> {
        self.state.lock().sessions.clone()
    }

    pub fn opened(&self) -> usize {
        self.state.lock().sessions.len()
    }

    pub fn open_sessions(&self) -> usize {
        self.state.lock().sessions.iter().filter(|s| s.is_open()).count()
    }

    pub fn latest(&self) -> Option<OpenedSession> {
        self.state.lock().sessions.last().cloned()
    }

    /// Push a delta through the most recently opened session
    pub fn deliver(&self, delta: BookDelta) -> bool {
        self.latest().is_some_and(|s| s.sink.deliver(delta))
    }

    /// Report an upstream fault on the most recently opened session
    pub fn fault(&self, reason: &str) -> bool {
        self.latest().is_some_and(|s| s.sink.fault(reason))
    }
}

struct ManualConnector {
    exchange: ExchangeId,
    feed: ManualFeed,
}

#[async_trait]
impl FeedConnector for ManualConnector {
    async fn open(&self, pair: &PairId, sink: DeltaSink) -> Result<Box<dyn FeedHandle>, FeedError> {
        let mut state = self.feed.state.lock();
        if state.failing {
            return Err(FeedError::Connection("exchange unreachable".to_string()));
        }
        if state.rejected_pairs.contains(pair) {
            return Err(FeedError::unknown_pair(&self.exchange, pair));
        }

        let open = Arc::new(AtomicBool::new(true));
        state.sessions.push(OpenedSession {
            exchange: self.exchange.clone(),
            pair: pair.clone(),
            sink,
            open: Arc::clone(&open),
        });
        Ok(Box::new(ManualHandle { open }))
    }
}

struct ManualHandle {
    open: Arc<AtomicBool>,
}

impl FeedHandle for ManualHandle {
    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub const INTERVAL: Duration = Duration::from_millis(500);

pub fn kraken_eth() -> SubscriptionTarget {
    SubscriptionTarget::new("kraken", "ETH-USD")
}

pub fn coinbase_btc() -> SubscriptionTarget {
    SubscriptionTarget::new("coinbase", "BTC-USD")
}

pub fn config() -> RelayConfig {
    RelayConfig::new(kraken_eth()).with_min_interval(INTERVAL)
}

pub fn spawn_relay(feed: &ManualFeed, config: RelayConfig) -> RelayHandle {
    let (handle, _task) = Relay::spawn(config, feed.registry());
    handle
}

/// Delta with a single bid level at `price`
pub fn delta(exchange: &str, pair: &str, price: i64) -> BookDelta {
    BookDelta::new(exchange, pair, 0.0)
        .with_bids(vec![LevelChange::new(Decimal::from(price), Decimal::ONE)])
}

/// Bid price carried by a serialised broadcast
pub fn bid_price(message: &str) -> f64 {
    let json: serde_json::Value = serde_json::from_str(message).expect("broadcast is JSON");
    assert_eq!(json["type"], "book");
    json["data"]["bid"][0][0].as_f64().expect("bid price")
}
