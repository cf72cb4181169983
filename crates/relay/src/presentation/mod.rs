pub mod router;
pub mod websocket;

pub use router::create_router;
pub use websocket::{parse_override, ws_handler};
