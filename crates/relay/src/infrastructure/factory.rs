//! Connector Factory
//!
//! Builds the feed registry from the configured exchange list.

use std::sync::Arc;
use std::time::Duration;

use relay_core::ExchangeId;

use super::coinbase::{COINBASE_WS_URL, CoinbaseConnector};
use super::kraken::{KRAKEN_WS_URL, KrakenConnector};
use super::simulator::SimulatorConnector;
use crate::application::FeedRegistry;
use crate::config::{ConnectorKind, ExchangeConfig, RelayConfigFile};
use crate::domain::FeedConnector;

/// Factory for creating feed connectors from configuration
pub struct ConnectorFactory;

impl ConnectorFactory {
    /// Create the connector for a single exchange entry
    pub fn create(config: &ExchangeConfig) -> Arc<dyn FeedConnector> {
        let exchange = ExchangeId::new(&config.id);
        match config.kind {
            ConnectorKind::Kraken => Arc::new(KrakenConnector::new(
                exchange,
                config.ws_url.as_deref().unwrap_or(KRAKEN_WS_URL),
                config.depth,
            )),
            ConnectorKind::Coinbase => Arc::new(CoinbaseConnector::new(
                exchange,
                config.ws_url.as_deref().unwrap_or(COINBASE_WS_URL),
            )),
            ConnectorKind::Simulator => Arc::new(SimulatorConnector::new(
                exchange,
                Duration::from_millis(config.tick_interval_ms),
                config.seed_price,
                config.depth,
            )),
        }
    }

    /// Register a connector for every enabled exchange
    pub fn build_registry(config: &RelayConfigFile) -> FeedRegistry {
        config
            .enabled_exchanges()
            .into_iter()
            .fold(FeedRegistry::new(), |registry, exchange| {
                tracing::debug!("Registering {:?} connector for {}", exchange.kind, exchange.id);
                registry.with(exchange.id.as_str(), Self::create(exchange))
            })
    }
}
