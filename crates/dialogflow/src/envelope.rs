//! Raw webhook payload handling and protocol matching.
//!
//! Decoding is deliberately lenient: an empty or undecodable body becomes an
//! empty payload rather than an error, because the provider retries
//! exploratory calls and a hard failure here would reject the whole turn.
//! Interpretation (does this request belong to us at all?) is the strict
//! part, answered by [`RawPayload::matches_protocol`].

use serde_json::{Map, Value};

/// Webhook protocol versions this driver recognizes, each with the envelope
/// key that marks a request as belonging to it. Adding a version is a data
/// change: extend [`ProtocolVersion::ALL`] and the match below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Dialogflow v2, the `queryResult` envelope. Fully parsed.
    V2,
    /// The legacy v1 `result` envelope. Recognized for routing; field
    /// parsing is best-effort only.
    V1,
}

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 2] = [ProtocolVersion::V2, ProtocolVersion::V1];

    /// Top-level key whose presence identifies this protocol version.
    pub fn envelope_key(self) -> &'static str {
        match self {
            Self::V2 => "queryResult",
            Self::V1 => "result",
        }
    }
}

/// The decoded request body: a JSON object, or empty when the body was not
/// one. Immutable after decoding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPayload {
    root: Map<String, Value>,
}

impl RawPayload {
    pub fn decode(raw_body: &[u8]) -> Self {
        let root = match serde_json::from_slice::<Value>(raw_body) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => Map::new(),
        };
        Self { root }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self { root: map },
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// The detect-intent event sub-object (`queryResult` for v2), or an
    /// empty map when absent or not an object.
    pub fn event(&self) -> Map<String, Value> {
        self.detect_version()
            .and_then(|version| self.root.get(version.envelope_key()))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Pure predicate: does the request carry any recognized envelope key?
    pub fn matches_protocol(&self) -> bool {
        self.detect_version().is_some()
    }

    pub fn detect_version(&self) -> Option<ProtocolVersion> {
        ProtocolVersion::ALL
            .into_iter()
            .find(|version| self.root.contains_key(version.envelope_key()))
    }

    /// The payload as a JSON value, for consumers that walk raw paths.
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}
