mod events;
mod session_state;
mod traits;

pub use events::{DeltaSink, FeedEvent, OutboundMessage, SessionEvent};
pub use session_state::SessionState;
pub use traits::{FeedConnector, FeedError, FeedHandle};
