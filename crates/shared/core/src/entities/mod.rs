mod delta;
mod side;
mod target;

pub use delta::{BookDelta, LevelChange};
pub use side::Side;
pub use target::{ExchangeId, PairId, SubscriptionTarget};
