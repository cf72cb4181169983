mod handler;
mod path;

pub use handler::ws_handler;
pub use path::parse_override;
