//! Override extraction from the connection request path
//!
//! Two encodings are understood. Query parameters (`?exchange=kraken&pair=eth/usd`)
//! are preferred; a query naming only one of the two keys is no override. When
//! the query names neither key, the legacy positional scan applies: the
//! exchange is the text after the first `=` up to five characters before the
//! second `=` (the length of `&pair`), and the pair is the text after the last `=`.

use relay_core::SubscriptionTarget;

/// Length of the separator the legacy scan assumes before the second `=`
const LEGACY_SEPARATOR_LEN: usize = "&pair".len();

/// Parse the subscription override a client asked for, if any.
///
/// Returns `None` when the path carries no usable override; the connection is
/// then registered against the current target unchanged.
pub fn parse_override(path_and_query: &str) -> Option<SubscriptionTarget> {
    let query = path_and_query.split_once('?').map(|(_, query)| query);

    match query.map(QueryOverride::parse) {
        Some(parsed) if parsed.is_named() => parsed.into_target(),
        _ => from_legacy_scan(path_and_query),
    }
}

/// `exchange` and `pair` query parameters, as given
#[derive(Debug, Default)]
struct QueryOverride {
    exchange: Option<String>,
    pair: Option<String>,
}

impl QueryOverride {
    fn parse(query: &str) -> Self {
        let mut parsed = QueryOverride::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "exchange" => parsed.exchange = Some(value.into_owned()),
                "pair" => parsed.pair = Some(value.into_owned()),
                _ => {}
            }
        }
        parsed
    }

    /// The query uses the parameter form, even if incompletely
    fn is_named(&self) -> bool {
        self.exchange.is_some() || self.pair.is_some()
    }

    fn into_target(self) -> Option<SubscriptionTarget> {
        target(self.exchange?.as_str(), self.pair?.as_str())
    }
}

fn from_legacy_scan(path: &str) -> Option<SubscriptionTarget> {
    let mut equals = path.match_indices('=').map(|(i, _)| i);
    let first = equals.next()?;
    let second = equals.next()?;
    let last = path.rfind('=')?;

    let start = first + 1;
    let end = second.checked_sub(LEGACY_SEPARATOR_LEN)?;
    if end < start {
        return None;
    }

    target(path.get(start..end)?, path.get(last + 1..)?)
}

fn target(exchange: &str, pair: &str) -> Option<SubscriptionTarget> {
    let (exchange, pair) = (exchange.trim(), pair.trim());
    if exchange.is_empty() || pair.is_empty() {
        return None;
    }
    Some(SubscriptionTarget::new(exchange, pair))
}
