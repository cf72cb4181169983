//! Coinbase Advanced Trade `level2` channel connector

use async_trait::async_trait;
use futures_util::StreamExt;
use relay_core::{BookDelta, ExchangeId, PairId, Side};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use crate::domain::{DeltaSink, FeedConnector, FeedError, FeedHandle};

use super::ws_session::{self, TaskFeedHandle, WsReader, WsWriter};

pub const COINBASE_WS_URL: &str = "wss://advanced-trade-ws.coinbase.com";

#[derive(Debug)]
enum CoinbaseMessage {
    Subscribed,
    Error(String),
    Level2 {
        timestamp: Option<String>,
        events: Vec<Level2Event>,
    },
    Other,
}

#[derive(Debug, Deserialize)]
struct Level2Event {
    product_id: String,
    #[serde(default)]
    updates: Vec<Level2Update>,
}

#[derive(Debug, Deserialize)]
struct Level2Update {
    side: String,
    price_level: Decimal,
    new_quantity: Decimal,
}

fn parse_message(text: &str) -> Result<CoinbaseMessage, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("type").and_then(Value::as_str) == Some("error") {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Ok(CoinbaseMessage::Error(message));
    }

    match value.get("channel").and_then(Value::as_str) {
        Some("subscriptions") => Ok(CoinbaseMessage::Subscribed),
        Some("l2_data") => {
            let timestamp = value
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string);
            let events = value.get("events").cloned().unwrap_or(Value::Array(Vec::new()));
            Ok(CoinbaseMessage::Level2 {
                timestamp,
                events: serde_json::from_value(events)?,
            })
        }
        _ => Ok(CoinbaseMessage::Other),
    }
}

fn side_of(side: &str) -> Option<Side> {
    match side {
        "bid" => Some(Side::Bid),
        "offer" | "ask" => Some(Side::Ask),
        _ => None,
    }
}

fn to_delta(
    exchange: &ExchangeId,
    pair: &PairId,
    timestamp: Option<&str>,
    event: Level2Event,
) -> BookDelta {
    let timestamp = timestamp
        .and_then(ws_session::rfc3339_seconds)
        .unwrap_or_else(ws_session::now_seconds);

    let mut delta = BookDelta::new(exchange.clone(), pair.clone(), timestamp);
    for update in event.updates {
        match side_of(&update.side) {
            Some(side) => delta.push(side, update.price_level, update.new_quantity),
            None => tracing::debug!("Skipping level with unknown side '{}'", update.side),
        }
    }
    delta
}

/// Connector for Coinbase's public level 2 feed
pub struct CoinbaseConnector {
    exchange: ExchangeId,
    url: String,
}

impl CoinbaseConnector {
    pub fn new(exchange: impl Into<ExchangeId>, url: impl Into<String>) -> Self {
        CoinbaseConnector {
            exchange: exchange.into(),
            url: url.into(),
        }
    }

    fn subscribe_request(product_id: &str) -> Value {
        json!({
            "type": "subscribe",
            "product_ids": [product_id],
            "channel": "level2",
        })
    }
}

#[async_trait]
impl FeedConnector for CoinbaseConnector {
    async fn open(&self, pair: &PairId, sink: DeltaSink) -> Result<Box<dyn FeedHandle>, FeedError> {
        // Product ids already use BASE-QUOTE
        let product_id = pair
            .with_separator('-')
            .ok_or_else(|| FeedError::unknown_pair(&self.exchange, pair))?;

        let (mut writer, mut reader) = ws_session::connect(&self.url).await?.split();
        ws_session::send_json(&mut writer, &Self::subscribe_request(&product_id)).await?;

        loop {
            let text = match reader.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(FeedError::Connection(
                        "closed before subscription was acknowledged".to_string(),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(FeedError::Connection(e.to_string())),
            };

            match parse_message(&text) {
                Ok(CoinbaseMessage::Subscribed) => break,
                Ok(CoinbaseMessage::Error(error)) => {
                    return Err(FeedError::Configuration(format!(
                        "{} rejected {}: {}",
                        self.exchange, product_id, error
                    )));
                }
                // The snapshot may arrive ahead of the acknowledgement
                Ok(CoinbaseMessage::Level2 { timestamp, events }) => {
                    forward(&self.exchange, pair, &product_id, timestamp.as_deref(), events, &sink);
                    break;
                }
                Ok(CoinbaseMessage::Other) => continue,
                Err(e) => {
                    return Err(FeedError::Protocol(format!(
                        "unexpected frame from {}: {}",
                        self.exchange, e
                    )));
                }
            }
        }

        tracing::info!("Subscribed to {} level2 on {}", product_id, self.exchange);
        let task = tokio::spawn(read_level2(
            reader,
            writer,
            self.exchange.clone(),
            pair.clone(),
            product_id,
            sink,
        ));
        Ok(Box::new(TaskFeedHandle::new(task)))
    }
}

/// Deliver every event for `product_id`; false once the relay is gone
fn forward(
    exchange: &ExchangeId,
    pair: &PairId,
    product_id: &str,
    timestamp: Option<&str>,
    events: Vec<Level2Event>,
    sink: &DeltaSink,
) -> bool {
    events
        .into_iter()
        .filter(|e| e.product_id == product_id)
        .map(|e| to_delta(exchange, pair, timestamp, e))
        .filter(|d| !d.is_empty())
        .all(|d| sink.deliver(d))
}

async fn read_level2(
    mut reader: WsReader,
    _writer: WsWriter,
    exchange: ExchangeId,
    pair: PairId,
    product_id: String,
    sink: DeltaSink,
) {
    while let Some(message) = reader.next().await {
        match message {
            Ok(Message::Text(text)) => match parse_message(&text) {
                Ok(CoinbaseMessage::Level2 { timestamp, events }) => {
                    if !forward(&exchange, &pair, &product_id, timestamp.as_deref(), events, &sink) {
                        return;
                    }
                }
                Ok(CoinbaseMessage::Error(error)) => {
                    sink.fault(format!("{} reported: {}", exchange, error));
                    return;
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Ignoring unparseable Coinbase frame: {}", e),
            },
            Ok(Message::Close(frame)) => {
                sink.fault(format!("{} closed the connection: {:?}", exchange, frame));
                return;
            }
            Ok(_) => {}
            Err(e) => {
                sink.fault(format!("{} read error: {}", exchange, e));
                return;
            }
        }
    }
    sink.fault(format!("{} stream ended", exchange));
}
