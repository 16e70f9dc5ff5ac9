//! The detect-intent envelope: everything the NLU provider resolved about
//! the request, behind plain accessors.
//!
//! Construction is the only fallible step. The driver stores the result as
//! an `Option` and lets every agent-dependent value degrade to
//! absent/default, so a malformed secondary structure never rejects a turn
//! whose primary payload decoded fine.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::action::{ActionConversation, ACTION_PAYLOAD_KEY};
use crate::envelope::{ProtocolVersion, RawPayload};
use crate::messages::Context;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("request does not carry a detect-intent envelope")]
    NotThisProtocol,
    #[error("malformed detect-intent payload: {detail}")]
    Malformed { detail: String },
}

/// Parsed detect-intent envelope for one request. Immutable; built once
/// per turn.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookAgent {
    version: ProtocolVersion,
    intent: String,
    action: String,
    session: String,
    parameters: Map<String, Value>,
    contexts: Vec<Context>,
    source: Option<String>,
}

impl WebhookAgent {
    pub fn from_payload(payload: &RawPayload) -> Result<Self, EnvelopeError> {
        let version = payload.detect_version().ok_or(EnvelopeError::NotThisProtocol)?;

        let event = payload
            .get(version.envelope_key())
            .and_then(Value::as_object)
            .ok_or_else(|| EnvelopeError::Malformed {
                detail: format!("`{}` is not an object", version.envelope_key()),
            })?;

        match version {
            ProtocolVersion::V2 => Ok(Self::from_v2(payload, event)),
            ProtocolVersion::V1 => Ok(Self::from_v1(payload, event)),
        }
    }

    fn from_v2(payload: &RawPayload, event: &Map<String, Value>) -> Self {
        let intent = event
            .get("intent")
            .and_then(|intent| intent.get("displayName"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let action = event.get("action").and_then(Value::as_str).unwrap_or_default().to_owned();
        let parameters = event
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let contexts = parse_contexts(event.get("outputContexts"));
        let session = payload
            .get("session")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let source = payload
            .get("originalDetectIntentRequest")
            .and_then(|original| original.get("source"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        Self {
            version: ProtocolVersion::V2,
            intent,
            action,
            session,
            parameters,
            contexts,
            source,
        }
    }

    // Legacy envelope: recognized so the request routes here, fields
    // filled best-effort only.
    fn from_v1(payload: &RawPayload, event: &Map<String, Value>) -> Self {
        let intent = event
            .get("metadata")
            .and_then(|metadata| metadata.get("intentName"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let action = event.get("action").and_then(Value::as_str).unwrap_or_default().to_owned();
        let parameters = event
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let session = payload
            .get("sessionId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        Self {
            version: ProtocolVersion::V1,
            intent,
            action,
            session,
            parameters,
            contexts: Vec::new(),
            source: None,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Display name of the detected intent.
    pub fn intent(&self) -> &str {
        &self.intent
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Session resource path; doubles as the reply address.
    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Input contexts active on this request, in wire order.
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn has_action_conversation(&self) -> bool {
        self.source.as_deref() == Some(ACTION_PAYLOAD_KEY)
    }

    /// A fresh conversation for replying to an Actions-on-Google request;
    /// `None` when the request came from any other surface.
    pub fn action_conversation(&self) -> Option<ActionConversation> {
        self.has_action_conversation().then(ActionConversation::new)
    }
}

fn parse_contexts(value: Option<&Value>) -> Vec<Context> {
    value
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
