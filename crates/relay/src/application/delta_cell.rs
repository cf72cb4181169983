//! Latest-delta buffer

use relay_core::{BookDelta, PairId};

/// Single-slot, most-recent-wins buffer for the latest order book delta.
///
/// Deltas are overwritten, never queued or merged: intermediate updates
/// between two flushes are dropped.
#[derive(Debug, Default)]
pub struct DeltaCell {
    latest: Option<BookDelta>,
}

impl DeltaCell {
    pub fn new() -> Self {
        DeltaCell { latest: None }
    }

    /// Store `delta` if it belongs to `current_pair`. Returns whether it was kept.
    pub fn accept(&mut self, current_pair: &PairId, delta: BookDelta) -> bool {
        if &delta.symbol != current_pair {
            tracing::trace!(
                "Discarding delta for {} (relaying {})",
                delta.symbol,
                current_pair
            );
            return false;
        }
        self.latest = Some(delta);
        true
    }

    pub fn latest(&self) -> Option<&BookDelta> {
        self.latest.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }
}
