use async_trait::async_trait;
use relay_core::PairId;
use thiserror::Error;

use super::events::DeltaSink;

/// Errors raised while opening an upstream session
#[derive(Error, Debug)]
pub enum FeedError {
    /// Exchange or pair not recognised, or the subscription was rejected
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Timed out opening feed after {0:?}")]
    Timeout(std::time::Duration),
}

impl FeedError {
    pub fn unknown_exchange(exchange: impl std::fmt::Display) -> Self {
        FeedError::Configuration(format!("unknown exchange '{}'", exchange))
    }

    pub fn unknown_pair(exchange: impl std::fmt::Display, pair: &PairId) -> Self {
        FeedError::Configuration(format!("pair '{}' not recognised by {}", pair, exchange))
    }
}

/// Feed Client capability: opens upstream order book subscriptions
///
/// One connector serves one exchange. `open` resolves once the exchange has
/// accepted the subscription; deltas then flow through the sink until the
/// returned handle is closed.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn open(&self, pair: &PairId, sink: DeltaSink) -> Result<Box<dyn FeedHandle>, FeedError>;
}

/// A running upstream subscription
pub trait FeedHandle: Send {
    /// Release all connector resources. Idempotent.
    fn close(&mut self);

    /// Check whether the upstream is still delivering
    fn is_open(&self) -> bool;
}
