//! Upstream session slot: at most one connector subscription at a time

use relay_core::SubscriptionTarget;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::domain::{DeltaSink, FeedError, FeedHandle, SessionEvent};

use super::feed_registry::FeedRegistry;

/// Lifecycle of the upstream session slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    Unstarted,
    Running,
    ShutDown,
}

/// Owns the single running upstream subscription.
///
/// Starting always shuts the previous session down first, so at most one
/// connector handle is ever open. Every start attempt takes a new epoch;
/// events tagged with an older epoch belong to a session that is gone.
pub struct FeedSession {
    connectors: FeedRegistry,
    events: mpsc::UnboundedSender<SessionEvent>,
    connect_timeout: Duration,
    handle: Option<Box<dyn FeedHandle>>,
    lifecycle: SessionLifecycle,
    epoch: u64,
}

impl FeedSession {
    pub fn new(
        connectors: FeedRegistry,
        events: mpsc::UnboundedSender<SessionEvent>,
        connect_timeout: Duration,
    ) -> Self {
        FeedSession {
            connectors,
            events,
            connect_timeout,
            handle: None,
            lifecycle: SessionLifecycle::Unstarted,
            epoch: 0,
        }
    }

    /// Open an upstream subscription for `target`.
    ///
    /// On failure no session is left running.
    pub async fn start(&mut self, target: &SubscriptionTarget) -> Result<(), FeedError> {
        self.stop();
        self.epoch += 1;

        let connector = self
            .connectors
            .get(&target.exchange)
            .ok_or_else(|| FeedError::unknown_exchange(&target.exchange))?;

        let sink = DeltaSink::new(self.epoch, self.events.clone());
        let handle = tokio::time::timeout(self.connect_timeout, connector.open(&target.pair, sink))
            .await
            .map_err(|_| FeedError::Timeout(self.connect_timeout))??;

        tracing::info!("Feed session {} running for {}", self.epoch, target);
        self.handle = Some(handle);
        self.lifecycle = SessionLifecycle::Running;
        Ok(())
    }

    /// Shut the running session down. No-op if none is running.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
            self.lifecycle = SessionLifecycle::ShutDown;
            tracing::info!("Feed session {} shut down", self.epoch);
        }
    }

    /// Whether an event tagged with `epoch` comes from the running session
    pub fn accepts(&self, epoch: u64) -> bool {
        self.is_running() && epoch == self.epoch
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == SessionLifecycle::Running && self.handle.is_some()
    }

    pub fn lifecycle(&self) -> SessionLifecycle {
        self.lifecycle
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn connectors(&self) -> &FeedRegistry {
        &self.connectors
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.stop();
    }
}
