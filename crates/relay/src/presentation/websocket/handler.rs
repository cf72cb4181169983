use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::Uri,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use relay_core::SubscriptionTarget;

use crate::application::{ClientId, ClientSubscription, RelayHandle};

use super::path::parse_override;

/// Deregisters the client on every exit path of the connection
struct Registration {
    relay: RelayHandle,
    id: ClientId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.relay.disconnect(self.id);
    }
}

/// Handle WebSocket upgrade on any path
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    uri: Uri,
    State(relay): State<RelayHandle>,
) -> Response {
    let requested = uri
        .path_and_query()
        .and_then(|path| parse_override(path.as_str()));
    ws.on_upgrade(move |socket| handle_socket(socket, relay, requested))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, relay: RelayHandle, requested: Option<SubscriptionTarget>) {
    if let Some(target) = &requested {
        tracing::debug!("Connection requests {}", target);
    }

    let ClientSubscription {
        id,
        mut messages,
        target,
    } = match relay.connect(requested).await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!("Rejecting connection: {}", e);
            return;
        }
    };
    let _registration = Registration {
        relay: relay.clone(),
        id,
    };

    let (mut sender, mut receiver) = socket.split();

    // Forward broadcasts until the relay closes this client's queue
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = messages.recv().await {
            if sender.send(Message::Text(payload.as_ref().into())).await.is_err() {
                return;
            }
        }
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "subscription ended".into(),
            })))
            .await;
    });

    // Inbound frames carry nothing; drain them until the peer closes
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!("Client {} ({}) connection closed", id, target);
}
