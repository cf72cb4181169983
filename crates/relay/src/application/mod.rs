pub mod client_registry;
pub mod config;
pub mod delta_cell;
pub mod emitter;
pub mod feed_registry;
pub mod feed_session;
pub mod relay;

pub use client_registry::{BroadcastReport, ClientId, ClientRegistry, DeliveryError};
pub use config::RelayConfig;
pub use delta_cell::DeltaCell;
pub use emitter::{BatchingEmitter, FlushOutcome};
pub use feed_registry::FeedRegistry;
pub use feed_session::{FeedSession, SessionLifecycle};
pub use relay::{ClientSubscription, Relay, RelayCommand, RelayError, RelayHandle, RelayStatus};
