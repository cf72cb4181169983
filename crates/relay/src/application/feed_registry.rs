use relay_core::ExchangeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::FeedConnector;

/// Maps exchange identifiers to the connector that serves them
#[derive(Clone, Default)]
pub struct FeedRegistry {
    connectors: HashMap<ExchangeId, Arc<dyn FeedConnector>>,
}

impl FeedRegistry {
    pub fn new() -> Self {
        FeedRegistry {
            connectors: HashMap::new(),
        }
    }

    /// Register a connector, replacing any previous one for the exchange
    pub fn register(&mut self, exchange: impl Into<ExchangeId>, connector: Arc<dyn FeedConnector>) {
        self.connectors.insert(exchange.into(), connector);
    }

    pub fn with(mut self, exchange: impl Into<ExchangeId>, connector: Arc<dyn FeedConnector>) -> Self {
        self.register(exchange, connector);
        self
    }

    pub fn get(&self, exchange: &ExchangeId) -> Option<Arc<dyn FeedConnector>> {
        self.connectors.get(exchange).cloned()
    }

    pub fn contains(&self, exchange: &ExchangeId) -> bool {
        self.connectors.contains_key(exchange)
    }

    /// Registered exchanges in name order
    pub fn exchanges(&self) -> Vec<ExchangeId> {
        let mut ids: Vec<_> = self.connectors.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl std::fmt::Debug for FeedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedRegistry")
            .field("exchanges", &self.exchanges())
            .finish()
    }
}
