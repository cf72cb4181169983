//! Book Relay Crate
//!
//! Relays a live order book stream from a single upstream exchange to any
//! number of WebSocket subscribers.
//!
//! # Architecture
//!
//! The relay:
//! - Holds exactly one upstream subscription (exchange + pair) at a time
//! - Keeps only the latest delta received for that subscription
//! - Broadcasts that delta to every subscriber, at most once per interval
//! - Lets any connecting client redirect the upstream subscription
//!   (`?exchange=<ID>&pair=<ID>`), which disconnects everyone else
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │   Kraken    │   │  Coinbase   │   │  Simulator  │
//! └──────┬──────┘   └──────┬──────┘   └──────┬──────┘
//!        │ one at a time   │                 │
//!        ▼                 ▼                 ▼
//! ┌──────────────────────────────────────────────────┐
//! │                   Relay actor                    │
//! │  ┌──────────────┐  ┌──────────────┐              │
//! │  │ FeedSession  │─▶│  DeltaCell   │              │
//! │  │  (epoch N)   │  │ (latest only)│              │
//! │  └──────────────┘  └──────┬───────┘              │
//! │                           ▼                      │
//! │  ┌──────────────────────────────────────────┐    │
//! │  │            BatchingEmitter               │    │
//! │  │     (≥ min_interval between flushes)     │    │
//! │  └──────────────────┬───────────────────────┘    │
//! │                     ▼                            │
//! │  ┌──────────────────────────────────────────┐    │
//! │  │            ClientRegistry                │    │
//! │  └──────────────────────────────────────────┘    │
//! └────────────────────────┬─────────────────────────┘
//!                          │ WebSocket (axum)
//!                          ▼
//!                   ┌─────────────┐
//!                   │ Subscribers │
//!                   └─────────────┘
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export key types
pub use domain::{
    DeltaSink, FeedConnector, FeedError, FeedEvent, FeedHandle, OutboundMessage, SessionEvent,
    SessionState,
};

pub use application::{
    BatchingEmitter, ClientId, ClientRegistry, ClientSubscription, DeliveryError, DeltaCell,
    FeedRegistry, FeedSession, FlushOutcome, Relay, RelayConfig, RelayError, RelayHandle,
    RelayStatus,
};

pub use infrastructure::{
    CoinbaseConnector, ConnectorFactory, KrakenConnector, SimulatorConnector, TaskFeedHandle,
};

pub use presentation::{create_router, parse_override};

pub use config::{
    ConfigError, ExchangeConfig, RelayConfigFile, load_config, load_config_from_str,
    load_default_config,
};
