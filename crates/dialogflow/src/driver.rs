//! The Dialogflow driver: one instance per webhook request.
//!
//! Construction does all the parsing up front — raw payload, optional
//! agent envelope, and the normalized incoming message — so every accessor
//! afterwards is a cheap read and repeated calls cannot disagree with each
//! other.

use serde_json::Value;

use banter_core::driver::{BotReply, Driver, RespondError, TurnResponse};
use banter_core::messages::IncomingMessage;

use crate::agent::WebhookAgent;
use crate::envelope::RawPayload;
use crate::messages::RenderError;
use crate::reply::{Reply, ReplyAccumulator, ReplyError};

pub const DRIVER_NAME: &str = "dialogflow";

/// Extra keys the normalized message carries NLU metadata under.
pub mod extras {
    /// Fulfillment messages the NLU service itself proposed (or null).
    pub const API_REPLY: &str = "apiReply";
    pub const API_ACTION: &str = "apiAction";
    /// Duplicate of the message text, kept for symmetry with the other
    /// extras.
    pub const API_INTENT: &str = "apiIntent";
    pub const API_PARAMETERS: &str = "apiParameters";
    pub const API_CONTEXTS: &str = "apiContexts";
}

pub struct DialogflowDriver {
    payload: RawPayload,
    agent: Option<WebhookAgent>,
    messages: Vec<IncomingMessage>,
}

impl DialogflowDriver {
    pub fn from_request(raw_body: &[u8]) -> Self {
        let payload = RawPayload::decode(raw_body);

        let agent = match WebhookAgent::from_payload(&payload) {
            Ok(agent) => Some(agent),
            Err(error) => {
                tracing::debug!(
                    driver = DRIVER_NAME,
                    error = %error,
                    "agent envelope unavailable, degrading to payload-only parsing"
                );
                None
            }
        };

        let messages = vec![normalize_message(&payload, agent.as_ref())];

        Self { payload, agent, messages }
    }

    /// The parsed agent envelope, when the request carried a usable one.
    pub fn agent(&self) -> Option<&WebhookAgent> {
        self.agent.as_ref()
    }

    /// A fresh reply accumulator addressed to this turn's session.
    pub fn response_builder(&self) -> ReplyAccumulator {
        let session = self.agent.as_ref().map(WebhookAgent::session).unwrap_or_default();
        ReplyAccumulator::new(session)
    }
}

/// Compute the normalized message once. The message text is the detected
/// intent name — the NLU service has already classified the utterance.
fn normalize_message(payload: &RawPayload, agent: Option<&WebhookAgent>) -> IncomingMessage {
    let intent = agent.map(WebhookAgent::intent).unwrap_or_default();
    let session = agent.map(WebhookAgent::session).unwrap_or_default();
    let sender = payload
        .get("originalDetectIntentRequest")
        .and_then(|original| original.pointer("/payload/user/userId"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let api_reply =
        payload.event().get("fulfillmentMessages").cloned().unwrap_or(Value::Null);
    let api_action =
        agent.map(|agent| Value::String(agent.action().to_owned())).unwrap_or(Value::Null);
    let api_intent = Value::String(intent.to_owned());
    let api_parameters =
        agent.map(|agent| Value::Object(agent.parameters().clone())).unwrap_or(Value::Null);
    let api_contexts = agent
        .and_then(|agent| serde_json::to_value(agent.contexts()).ok())
        .unwrap_or(Value::Null);

    IncomingMessage::new(intent, sender, session)
        .with_extra(extras::API_REPLY, api_reply)
        .with_extra(extras::API_ACTION, api_action)
        .with_extra(extras::API_INTENT, api_intent)
        .with_extra(extras::API_PARAMETERS, api_parameters)
        .with_extra(extras::API_CONTEXTS, api_contexts)
}

impl Driver for DialogflowDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn matches_request(&self) -> bool {
        self.payload.matches_protocol()
    }

    fn messages(&self) -> &[IncomingMessage] {
        &self.messages
    }

    fn build_turn_response(&self, replies: Vec<BotReply>) -> Result<TurnResponse, RespondError> {
        let mut accumulator = self.response_builder();

        for reply in replies {
            match reply {
                BotReply::Text(text) => {
                    accumulator.add_reply(Reply::Text(text));
                }
                BotReply::Message(message) => {
                    accumulator.add_outgoing(&message);
                }
                BotReply::Raw(value) => {
                    accumulator.add_value(value)?;
                }
            }
        }

        let body = accumulator.render().to_body()?;
        Ok(TurnResponse::json(body))
    }
}

impl From<ReplyError> for RespondError {
    fn from(error: ReplyError) -> Self {
        match error {
            ReplyError::InvalidMessageKind { found } => Self::InvalidReply { found },
        }
    }
}

impl From<RenderError> for RespondError {
    fn from(error: RenderError) -> Self {
        Self::Serialization(error.to_string())
    }
}
