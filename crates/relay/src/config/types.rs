use relay_core::SubscriptionTarget;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::RelayConfig;

/// Root configuration for the relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfigFile {
    #[serde(default)]
    pub server: ServerConfig,
    /// Target relayed at startup, before any client override
    #[serde(default = "default_target")]
    pub default_target: SubscriptionTarget,
    #[serde(default)]
    pub batching: BatchingConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    /// Upstream exchanges a client may redirect the relay to
    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Broadcast coalescing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Minimum wall-clock interval between two broadcasts
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
    /// Outbound messages buffered per client before it is dropped
    #[serde(default = "default_client_queue_capacity")]
    pub client_queue_capacity: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        BatchingConfig {
            min_interval_ms: default_min_interval(),
            client_queue_capacity: default_client_queue_capacity(),
        }
    }
}

/// Upstream session configuration shared by all connectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Upper bound on connecting and subscribing to an exchange
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Delay before restarting a session after an upstream fault
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Restart attempts after an upstream fault; 0 leaves the relay idle
    #[serde(default)]
    pub max_reconnect_attempts: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            connect_timeout_ms: default_connect_timeout(),
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_attempts: 0,
        }
    }
}

/// Which connector implementation serves an exchange entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    Kraken,
    Coinbase,
    Simulator,
}

/// Configuration for a single upstream exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Identifier clients use in overrides (capitalised before lookup)
    pub id: String,
    pub kind: ConnectorKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// WebSocket URL; connector default when absent
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Book depth requested from the exchange
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Simulator only: interval between synthetic deltas
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Simulator only: starting mid price
    #[serde(default = "default_seed_price")]
    pub seed_price: f64,
}

impl RelayConfigFile {
    /// Convert to the application-layer relay configuration
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::new(self.default_target.clone())
            .with_min_interval(Duration::from_millis(self.batching.min_interval_ms))
            .with_client_queue_capacity(self.batching.client_queue_capacity)
            .with_connect_timeout(Duration::from_millis(self.feed.connect_timeout_ms))
            .with_reconnect(
                Duration::from_millis(self.feed.reconnect_delay_ms),
                self.feed.max_reconnect_attempts,
            )
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8768
}

fn default_target() -> SubscriptionTarget {
    SubscriptionTarget::new("Kraken", "ETH-USD")
}

fn default_min_interval() -> u64 {
    500
}

fn default_client_queue_capacity() -> usize {
    64
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_depth() -> u32 {
    10
}

fn default_tick_interval() -> u64 {
    100
}

fn default_seed_price() -> f64 {
    2000.0
}
