//! Plumbing shared by the WebSocket connectors

use futures_util::SinkExt;
use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::domain::{FeedError, FeedHandle};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsWriter = SplitSink<WsStream, Message>;
pub type WsReader = SplitStream<WsStream>;

/// Open a WebSocket connection to an exchange
pub async fn connect(url: &str) -> Result<WsStream, FeedError> {
    let (stream, _) = connect_async(url)
        .await
        .map_err(|e| FeedError::Connection(format!("{}: {}", url, e)))?;
    Ok(stream)
}

/// Send a JSON request frame
pub async fn send_json(writer: &mut WsWriter, request: &serde_json::Value) -> Result<(), FeedError> {
    writer
        .send(Message::Text(request.to_string().into()))
        .await
        .map_err(|e| FeedError::Connection(e.to_string()))
}

/// Session handle backed by the connector's reader task.
///
/// Closing aborts the task, which drops the socket.
pub struct TaskFeedHandle {
    task: Option<JoinHandle<()>>,
}

impl TaskFeedHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        TaskFeedHandle { task: Some(task) }
    }
}

impl FeedHandle for TaskFeedHandle {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_open(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TaskFeedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Current time in fractional unix seconds
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Parse an RFC 3339 exchange timestamp into fractional unix seconds
pub fn rfc3339_seconds(timestamp: &str) -> Option<f64> {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|t| t.timestamp_micros() as f64 / 1_000_000.0)
}
