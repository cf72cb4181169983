//! Kraken WebSocket v2 `book` channel connector

use async_trait::async_trait;
use futures_util::StreamExt;
use relay_core::{BookDelta, ExchangeId, LevelChange, PairId};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use crate::domain::{DeltaSink, FeedConnector, FeedError, FeedHandle};

use super::ws_session::{self, TaskFeedHandle, WsReader, WsWriter};

pub const KRAKEN_WS_URL: &str = "wss://ws.kraken.com/v2";

/// Parsed Kraken frame, reduced to what the relay needs
#[derive(Debug)]
enum KrakenMessage {
    Subscribed,
    Rejected(String),
    Book(Vec<BookData>),
    Other,
}

#[derive(Debug, Deserialize)]
struct MethodResponse {
    method: String,
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BookData {
    symbol: String,
    #[serde(default)]
    bids: Vec<KrakenLevel>,
    #[serde(default)]
    asks: Vec<KrakenLevel>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KrakenLevel {
    price: Decimal,
    qty: Decimal,
}

fn parse_message(text: &str) -> Result<KrakenMessage, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("method").is_some() {
        let response: MethodResponse = serde_json::from_value(value)?;
        if response.method != "subscribe" {
            return Ok(KrakenMessage::Other);
        }
        return Ok(if response.success {
            KrakenMessage::Subscribed
        } else {
            KrakenMessage::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "subscription rejected".to_string()),
            )
        });
    }

    match value.get("channel").and_then(Value::as_str) {
        Some("book") => {
            let data = value.get("data").cloned().unwrap_or(Value::Array(Vec::new()));
            Ok(KrakenMessage::Book(serde_json::from_value(data)?))
        }
        _ => Ok(KrakenMessage::Other),
    }
}

fn to_delta(exchange: &ExchangeId, pair: &PairId, data: BookData) -> BookDelta {
    let timestamp = data
        .timestamp
        .as_deref()
        .and_then(ws_session::rfc3339_seconds)
        .unwrap_or_else(ws_session::now_seconds);
    let levels = |levels: Vec<KrakenLevel>| {
        levels
            .into_iter()
            .map(|l| LevelChange::new(l.price, l.qty))
            .collect()
    };

    BookDelta::new(exchange.clone(), pair.clone(), timestamp)
        .with_bids(levels(data.bids))
        .with_asks(levels(data.asks))
}

/// Connector for Kraken's public order book feed
pub struct KrakenConnector {
    exchange: ExchangeId,
    url: String,
    depth: u32,
}

impl KrakenConnector {
    pub fn new(exchange: impl Into<ExchangeId>, url: impl Into<String>, depth: u32) -> Self {
        KrakenConnector {
            exchange: exchange.into(),
            url: url.into(),
            depth,
        }
    }

    fn subscribe_request(&self, symbol: &str) -> Value {
        json!({
            "method": "subscribe",
            "params": {
                "channel": "book",
                "symbol": [symbol],
                "depth": self.depth,
            }
        })
    }
}

#[async_trait]
impl FeedConnector for KrakenConnector {
    async fn open(&self, pair: &PairId, sink: DeltaSink) -> Result<Box<dyn FeedHandle>, FeedError> {
        // Kraken names pairs BASE/QUOTE
        let symbol = pair
            .with_separator('/')
            .ok_or_else(|| FeedError::unknown_pair(&self.exchange, pair))?;

        let (mut writer, mut reader) = ws_session::connect(&self.url).await?.split();
        ws_session::send_json(&mut writer, &self.subscribe_request(&symbol)).await?;

        // Hold the caller until Kraken accepts or rejects the subscription
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
                Ok(KrakenMessage::Subscribed) => break,
                Ok(KrakenMessage::Rejected(error)) => {
                    return Err(FeedError::Configuration(format!(
                        "{} rejected {}: {}",
                        self.exchange, symbol, error
                    )));
                }
                Ok(_) => continue,
                Err(e) => tracing::debug!("Ignoring unparseable Kraken frame: {}", e),
            }
        }

        tracing::info!("Subscribed to {} book on {}", symbol, self.exchange);
        let task = tokio::spawn(read_book(
            reader,
            writer,
            self.exchange.clone(),
            pair.clone(),
            symbol,
            sink,
        ));
        Ok(Box::new(TaskFeedHandle::new(task)))
    }
}

async fn read_book(
    mut reader: WsReader,
    // Kept alive so the connection is not half-closed
    _writer: WsWriter,
    exchange: ExchangeId,
    pair: PairId,
    symbol: String,
    sink: DeltaSink,
) {
    while let Some(message) = reader.next().await {
        match message {
            Ok(Message::Text(text)) => match parse_message(&text) {
                Ok(KrakenMessage::Book(entries)) => {
                    for data in entries.into_iter().filter(|d| d.symbol == symbol) {
                        if !sink.deliver(to_delta(&exchange, &pair, data)) {
                            return;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Ignoring unparseable Kraken frame: {}", e),
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
