//! Batching Emitter
//!
//! Flushes the latest delta to all subscribers at most once per configured
//! interval. The interval is compared against the full elapsed duration since
//! the previous broadcast.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::OutboundMessage;

use super::client_registry::{BroadcastReport, ClientRegistry};
use super::delta_cell::DeltaCell;

/// Result of evaluating a flush opportunity
#[derive(Debug)]
pub enum FlushOutcome {
    /// The latest delta was broadcast
    Flushed(BroadcastReport),
    /// Throttled; the caller should re-evaluate after this delay
    Deferred(Duration),
    /// Throttled; a deferred evaluation is already pending
    Waiting,
    /// Nothing to send or nobody to send it to
    Idle,
}

/// Decides when the delta cell is flushed to the client registry
#[derive(Debug)]
pub struct BatchingEmitter {
    /// Minimum interval between broadcasts
    min_interval: Duration,
    /// Instant of the last broadcast that reached a client (the emission clock)
    last_emission: Instant,
    /// A deferred evaluation has been requested and not yet run
    timer_armed: bool,
    broadcasts: u64,
}

impl BatchingEmitter {
    /// Create an emitter whose clock starts at `now`
    pub fn new(min_interval: Duration, now: Instant) -> Self {
        BatchingEmitter {
            min_interval,
            last_emission: now,
            timer_armed: false,
            broadcasts: 0,
        }
    }

    /// Flush iff the cell holds a delta, at least one client is registered,
    /// and the interval has fully elapsed since the last broadcast.
    pub fn evaluate(
        &mut self,
        now: Instant,
        cell: &DeltaCell,
        registry: &mut ClientRegistry,
    ) -> FlushOutcome {
        let Some(delta) = cell.latest() else {
            return FlushOutcome::Idle;
        };
        if registry.is_empty() {
            return FlushOutcome::Idle;
        }

        let remaining = self.time_until_next(now);
        if !remaining.is_zero() {
            if self.timer_armed {
                return FlushOutcome::Waiting;
            }
            self.timer_armed = true;
            return FlushOutcome::Deferred(remaining);
        }

        let payload: Arc<str> = match serde_json::to_string(&OutboundMessage::Book(delta)) {
            Ok(json) => Arc::from(json),
            Err(e) => {
                tracing::error!("Failed to serialise book message: {}", e);
                return FlushOutcome::Idle;
            }
        };

        let report = registry.broadcast(&payload);
        // Nobody received it: the clock stays where the last delivery left it
        if report.delivered > 0 {
            self.last_emission = self.last_emission.max(now);
            self.broadcasts += 1;
        }
        FlushOutcome::Flushed(report)
    }

    /// Mark the pending deferred evaluation as consumed
    pub fn timer_fired(&mut self) {
        self.timer_armed = false;
    }

    /// Time until the interval has elapsed, zero if a flush may run now
    pub fn time_until_next(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_emission);
        self.min_interval.saturating_sub(elapsed)
    }

    pub fn broadcasts(&self) -> u64 {
        self.broadcasts
    }
}
