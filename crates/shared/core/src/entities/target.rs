//! Subscription identifiers
//!
//! Types naming what the relay is currently streaming: an exchange and a
//! trading pair on that exchange.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an upstream exchange
///
/// Exchange IDs are capitalised on construction (e.g., "kraken" and "KRAKEN"
/// both become "Kraken"), which is the form used for registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ExchangeId(String);

impl ExchangeId {
    /// Create a new exchange ID (capitalised)
    pub fn new(id: impl AsRef<str>) -> Self {
        let id = id.as_ref().trim();
        let mut chars = id.chars();
        let normalized = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        };
        ExchangeId(normalized)
    }

    /// Get the exchange ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Kraken exchange
    pub fn kraken() -> Self {
        ExchangeId::new("kraken")
    }

    /// Coinbase exchange
    pub fn coinbase() -> Self {
        ExchangeId::new("coinbase")
    }

    /// Synthetic in-process feed
    pub fn simulator() -> Self {
        ExchangeId::new("simulator")
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExchangeId {
    fn from(s: &str) -> Self {
        ExchangeId::new(s)
    }
}

impl From<String> for ExchangeId {
    fn from(s: String) -> Self {
        ExchangeId::new(s)
    }
}

impl From<ExchangeId> for String {
    fn from(id: ExchangeId) -> Self {
        id.0
    }
}

/// Trading pair in the relay's canonical `BASE-QUOTE` form
///
/// Construction upper-cases the input and replaces every `/` with `-`, so
/// "eth/usd" and "ETH-USD" name the same pair. Connectors translate this form
/// into each exchange's native symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PairId(String);

impl PairId {
    pub fn new(pair: impl AsRef<str>) -> Self {
        PairId(pair.as_ref().trim().replace('/', "-").to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(base, quote)`.
    ///
    /// Returns `None` unless the pair is exactly two non-empty alphanumeric
    /// assets joined by a single `-`.
    pub fn assets(&self) -> Option<(&str, &str)> {
        let (base, quote) = self.0.split_once('-')?;
        let valid = |asset: &str| {
            !asset.is_empty() && asset.chars().all(|c| c.is_ascii_alphanumeric())
        };
        (valid(base) && valid(quote)).then_some((base, quote))
    }

    /// Render with a different asset separator (Kraken uses `/`)
    pub fn with_separator(&self, separator: char) -> Option<String> {
        let (base, quote) = self.assets()?;
        Some(format!("{}{}{}", base, separator, quote))
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PairId {
    fn from(s: &str) -> Self {
        PairId::new(s)
    }
}

impl From<String> for PairId {
    fn from(s: String) -> Self {
        PairId::new(s)
    }
}

impl From<PairId> for String {
    fn from(pair: PairId) -> Self {
        pair.0
    }
}

/// The (exchange, pair) currently relayed
///
/// Immutable value: a reconfiguration replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionTarget {
    pub exchange: ExchangeId,
    pub pair: PairId,
}

impl SubscriptionTarget {
    pub fn new(exchange: impl Into<ExchangeId>, pair: impl Into<PairId>) -> Self {
        SubscriptionTarget {
            exchange: exchange.into(),
            pair: pair.into(),
        }
    }
}

impl fmt::Display for SubscriptionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.pair)
    }
}
