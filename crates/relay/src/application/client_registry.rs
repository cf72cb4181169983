use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Unique client identifier, never reused within a process
pub type ClientId = u64;

/// Why a broadcast could not be handed to a client
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("client queue full")]
    Full,
    #[error("client connection closed")]
    Closed,
}

/// Outbound end of one subscriber connection
#[derive(Debug)]
struct ClientHandle {
    tx: mpsc::Sender<Arc<str>>,
}

impl ClientHandle {
    /// Non-blocking hand-off; a slow client fails instead of stalling the flush
    fn deliver(&self, payload: &Arc<str>) -> Result<(), DeliveryError> {
        self.tx.try_send(Arc::clone(payload)).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Outcome of one fan-out
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Clients removed because delivery failed
    pub dropped: Vec<(ClientId, DeliveryError)>,
}

/// Set of connected subscribers eligible for broadcasts.
///
/// Dropping a client's handle closes its queue, which ends the connection's
/// writer; eviction and removal therefore also disconnect the subscriber.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: BTreeMap<ClientId, ClientHandle>,
    next_id: ClientId,
    queue_capacity: usize,
}

impl ClientRegistry {
    pub fn new(queue_capacity: usize) -> Self {
        ClientRegistry {
            clients: BTreeMap::new(),
            next_id: 1,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new client and return its id with the receiving end of its queue
    pub fn register(&mut self) -> (ClientId, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.next_id;
        self.next_id += 1;
        self.clients.insert(id, ClientHandle { tx });
        (id, rx)
    }

    /// Remove a client. Returns false if it was not registered.
    pub fn remove(&mut self, id: ClientId) -> bool {
        self.clients.remove(&id).is_some()
    }

    /// Drop every client, returning how many were evicted
    pub fn clear(&mut self) -> usize {
        let evicted = self.clients.len();
        self.clients.clear();
        evicted
    }

    /// Deliver `payload` to every client, removing those that fail
    pub fn broadcast(&mut self, payload: &Arc<str>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, client) in &self.clients {
            match client.deliver(payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => report.dropped.push((*id, e)),
            }
        }

        for (id, _) in &report.dropped {
            self.clients.remove(id);
        }

        report
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
