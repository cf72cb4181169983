//! Relay actor
//!
//! Single owner of the subscription target, delta cell, client registry,
//! emission clock and feed session. Connections and connectors reach it only
//! through channels, so every state transition runs to completion before the
//! next one starts and no flush ever interleaves with a registry change.

use relay_core::{ExchangeId, SubscriptionTarget};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::domain::{FeedEvent, SessionEvent, SessionState};

use super::client_registry::{ClientId, ClientRegistry};
use super::config::RelayConfig;
use super::delta_cell::DeltaCell;
use super::emitter::{BatchingEmitter, FlushOutcome};
use super::feed_registry::FeedRegistry;
use super::feed_session::FeedSession;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Relay stopped")]
    Stopped,
}

/// Commands accepted by the relay actor
#[derive(Debug)]
pub enum RelayCommand {
    /// Register a subscriber, switching the target first if it asks for another one
    Connect {
        requested: Option<SubscriptionTarget>,
        reply: oneshot::Sender<ClientSubscription>,
    },
    Disconnect {
        id: ClientId,
    },
    /// A deferred flush evaluation is due
    FlushDue,
    /// Retry the session that faulted under `epoch`
    Reconnect {
        epoch: u64,
    },
    Status {
        reply: oneshot::Sender<RelayStatus>,
    },
    Shutdown,
}

/// A registered subscriber's view of the relay
#[derive(Debug)]
pub struct ClientSubscription {
    pub id: ClientId,
    /// Serialised broadcasts; closed when the client is evicted or dropped
    pub messages: mpsc::Receiver<Arc<str>>,
    /// Target being relayed when the client was registered
    pub target: SubscriptionTarget,
}

/// Point-in-time snapshot of the relay state
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub target: SubscriptionTarget,
    pub state: &'static str,
    pub session_active: bool,
    pub session_epoch: u64,
    pub clients: usize,
    pub has_delta: bool,
    pub broadcasts: u64,
    pub exchanges: Vec<ExchangeId>,
}

/// Cloneable handle for talking to the relay actor
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::UnboundedSender<RelayCommand>,
}

impl RelayHandle {
    /// Register a new subscriber, optionally redirecting the relay first
    pub async fn connect(
        &self,
        requested: Option<SubscriptionTarget>,
    ) -> Result<ClientSubscription, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Connect { requested, reply })?;
        rx.await.map_err(|_| RelayError::Stopped)
    }

    /// Deregister a subscriber. Safe to call for ids already removed.
    pub fn disconnect(&self, id: ClientId) {
        let _ = self.send(RelayCommand::Disconnect { id });
    }

    pub async fn status(&self) -> Result<RelayStatus, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Status { reply })?;
        rx.await.map_err(|_| RelayError::Stopped)
    }

    pub fn shutdown(&self) {
        let _ = self.send(RelayCommand::Shutdown);
    }

    fn send(&self, command: RelayCommand) -> Result<(), RelayError> {
        self.tx.send(command).map_err(|_| RelayError::Stopped)
    }
}

enum Next {
    Command(Option<RelayCommand>),
    Feed(SessionEvent),
}

/// The relay actor
pub struct Relay {
    config: RelayConfig,
    target: SubscriptionTarget,
    state: SessionState,
    session: FeedSession,
    cell: DeltaCell,
    clients: ClientRegistry,
    emitter: BatchingEmitter,
    commands: mpsc::UnboundedReceiver<RelayCommand>,
    /// Used by timers; weak so dropping every handle still stops the actor
    scheduler: mpsc::WeakUnboundedSender<RelayCommand>,
    feed_events: mpsc::UnboundedReceiver<SessionEvent>,
    reconnect_attempts: u32,
}

impl Relay {
    pub fn new(config: RelayConfig, connectors: FeedRegistry) -> (Relay, RelayHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (events_tx, feed_events) = mpsc::unbounded_channel();

        let relay = Relay {
            target: config.default_target.clone(),
            state: SessionState::NoSession,
            session: FeedSession::new(connectors, events_tx, config.connect_timeout),
            cell: DeltaCell::new(),
            clients: ClientRegistry::new(config.client_queue_capacity),
            emitter: BatchingEmitter::new(config.min_interval, Instant::now()),
            commands,
            scheduler: tx.downgrade(),
            feed_events,
            reconnect_attempts: 0,
            config,
        };

        (relay, RelayHandle { tx })
    }

    /// Build the actor and run it on a new task
    pub fn spawn(config: RelayConfig, connectors: FeedRegistry) -> (RelayHandle, JoinHandle<()>) {
        let (relay, handle) = Relay::new(config, connectors);
        let task = tokio::spawn(relay.run());
        (handle, task)
    }

    /// Start the default target, then serve commands until shutdown or until
    /// every handle has been dropped.
    pub async fn run(mut self) {
        tracing::info!("Relay starting with default target {}", self.target);
        self.start_session().await;

        loop {
            // Feed events first: anything a connector reported before a
            // command was queued is applied before that command runs
            let next = tokio::select! {
                biased;
                Some(event) = self.feed_events.recv() => Next::Feed(event),
                command = self.commands.recv() => Next::Command(command),
            };

            match next {
                Next::Command(None) | Next::Command(Some(RelayCommand::Shutdown)) => break,
                Next::Command(Some(command)) => self.handle_command(command).await,
                Next::Feed(event) => self.handle_feed_event(event),
            }
        }

        self.session.stop();
        let evicted = self.clients.clear();
        tracing::info!("Relay stopped ({} clients disconnected)", evicted);
    }

    async fn handle_command(&mut self, command: RelayCommand) {
        match command {
            RelayCommand::Connect { requested, reply } => self.connect(requested, reply).await,
            RelayCommand::Disconnect { id } => {
                if self.clients.remove(id) {
                    tracing::debug!("Client {} disconnected ({} remaining)", id, self.clients.len());
                }
            }
            RelayCommand::FlushDue => {
                self.emitter.timer_fired();
                self.evaluate_flush();
            }
            RelayCommand::Reconnect { epoch } => self.reconnect(epoch).await,
            RelayCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            RelayCommand::Shutdown => {}
        }
    }

    async fn connect(
        &mut self,
        requested: Option<SubscriptionTarget>,
        reply: oneshot::Sender<ClientSubscription>,
    ) {
        if let Some(target) = requested {
            self.switch(target).await;
        }

        let (id, messages) = self.clients.register();
        let subscription = ClientSubscription {
            id,
            messages,
            target: self.target.clone(),
        };

        if reply.send(subscription).is_err() {
            // Connection went away while waiting for registration
            self.clients.remove(id);
            return;
        }

        tracing::info!(
            "Client {} connected to {} ({} total)",
            id,
            self.target,
            self.clients.len()
        );
        self.evaluate_flush();
    }

    /// Redirect the single upstream subscription to `new_target`.
    ///
    /// Evicts every registered client: they were subscribed to the old target.
    async fn switch(&mut self, new_target: SubscriptionTarget) {
        if new_target == self.target {
            return;
        }

        tracing::info!("Switching relay from {} to {}", self.target, new_target);
        self.state = SessionState::Reconfiguring;
        self.session.stop();
        self.cell.clear();
        self.target = new_target;

        let evicted = self.clients.clear();
        if evicted > 0 {
            tracing::info!("Evicted {} clients subscribed to the previous target", evicted);
        }

        self.reconnect_attempts = 0;
        self.start_session().await;
    }

    async fn start_session(&mut self) -> bool {
        match self.session.start(&self.target).await {
            Ok(()) => {
                self.state = SessionState::Active(self.target.clone());
                self.reconnect_attempts = 0;
                true
            }
            Err(e) => {
                tracing::warn!("Could not open feed for {}: {}", self.target, e);
                self.cell.clear();
                self.state = SessionState::NoSession;
                false
            }
        }
    }

    fn handle_feed_event(&mut self, SessionEvent { epoch, event }: SessionEvent) {
        if !self.session.accepts(epoch) {
            tracing::trace!(
                "Discarding event from session {} (current {})",
                epoch,
                self.session.epoch()
            );
            return;
        }

        match event {
            FeedEvent::Delta(delta) => {
                if self.cell.accept(&self.target.pair, delta) {
                    self.evaluate_flush();
                }
            }
            FeedEvent::Fault(reason) => self.on_fault(reason),
        }
    }

    fn on_fault(&mut self, reason: String) {
        tracing::warn!("Upstream feed for {} failed: {}", self.target, reason);
        self.session.stop();
        self.cell.clear();
        self.state = SessionState::NoSession;
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            if self.config.max_reconnect_attempts > 0 {
                tracing::warn!(
                    "Giving up on {} after {} reconnect attempts",
                    self.target,
                    self.reconnect_attempts
                );
            }
            return;
        }

        self.reconnect_attempts += 1;
        self.schedule(
            self.config.reconnect_delay,
            RelayCommand::Reconnect {
                epoch: self.session.epoch(),
            },
        );
    }

    async fn reconnect(&mut self, epoch: u64) {
        // A switch or another start attempt happened since the fault
        if epoch != self.session.epoch() || self.session.is_running() {
            return;
        }

        tracing::info!(
            "Reconnecting to {} (attempt {}/{})",
            self.target,
            self.reconnect_attempts,
            self.config.max_reconnect_attempts
        );
        if !self.start_session().await {
            self.schedule_reconnect();
        }
    }

    fn evaluate_flush(&mut self) {
        match self
            .emitter
            .evaluate(Instant::now(), &self.cell, &mut self.clients)
        {
            FlushOutcome::Flushed(report) => {
                for (id, e) in &report.dropped {
                    tracing::warn!("Dropping client {}: {}", id, e);
                }
                tracing::debug!(
                    "Broadcast {} delivered to {} clients",
                    self.emitter.broadcasts(),
                    report.delivered
                );
            }
            FlushOutcome::Deferred(delay) => self.schedule(delay, RelayCommand::FlushDue),
            FlushOutcome::Waiting | FlushOutcome::Idle => {}
        }
    }

    fn schedule(&self, delay: Duration, command: RelayCommand) {
        let scheduler = self.scheduler.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = scheduler.upgrade() {
                let _ = tx.send(command);
            }
        });
    }

    fn status(&self) -> RelayStatus {
        RelayStatus {
            target: self.target.clone(),
            state: self.state.label(),
            session_active: self.session.is_running(),
            session_epoch: self.session.epoch(),
            clients: self.clients.len(),
            has_delta: !self.cell.is_empty(),
            broadcasts: self.emitter.broadcasts(),
            exchanges: self.session.connectors().exchanges(),
        }
    }
}
