//! Driver seam between the runtime and a webhook protocol.
//!
//! A driver owns exactly one request/response turn: it is constructed from
//! the raw request body, normalizes it into [`IncomingMessage`]s, and
//! renders the bot's replies back into the protocol's response payload.
//! Instances are never shared across turns, so drivers need no interior
//! locking.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::messages::{Answer, IncomingMessage, OutgoingMessage, User};

/// One reply item handed from bot logic to a driver.
///
/// `Raw` carries a driver-specific JSON value (a rich card, an outgoing
/// context, a conversational-action payload); each driver classifies the
/// shape itself and rejects what it cannot express.
#[derive(Clone, Debug, PartialEq)]
pub enum BotReply {
    Text(String),
    Message(OutgoingMessage),
    Raw(Value),
}

impl BotReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// A fully rendered protocol response, ready to hand to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl TurnResponse {
    pub fn json(body: String) -> Self {
        Self { status: 200, content_type: "application/json", body }
    }
}

#[derive(Debug, Error)]
pub enum RespondError {
    /// A reply item was none of the shapes the driver understands. Strict:
    /// silently dropping a bot's reply would corrupt the conversation.
    #[error("invalid reply kind: {found}")]
    InvalidReply { found: String },
    /// The rendered response could not be serialized. Fatal for the turn:
    /// no partial response is ever sent.
    #[error("failed to serialize response payload: {0}")]
    Serialization(String),
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver api request failed: {0}")]
    ApiRequest(String),
}

pub trait Driver: Send + Sync {
    /// Stable driver identifier, e.g. `"dialogflow"`.
    fn name(&self) -> &'static str;

    /// Whether the request this driver was built from belongs to its
    /// protocol. Callers must check this before trusting `messages()`.
    fn matches_request(&self) -> bool;

    /// The normalized messages of this turn. Computed once at construction;
    /// repeated calls are free.
    fn messages(&self) -> &[IncomingMessage];

    fn user(&self, message: &IncomingMessage) -> User {
        User::new(message.sender().map(str::to_owned))
    }

    fn conversation_answer(&self, message: &IncomingMessage) -> Answer {
        Answer::from_message(message.clone())
    }

    fn is_bot(&self) -> bool {
        false
    }

    fn is_configured(&self) -> bool {
        true
    }

    /// Render the bot's replies into the protocol response for this turn.
    fn build_turn_response(&self, replies: Vec<BotReply>) -> Result<TurnResponse, RespondError>;

    /// Low-level provider API pass-through. An extension seam: the default
    /// implementation performs no request and reports nothing.
    fn api_request(
        &self,
        _endpoint: &str,
        _parameters: &Map<String, Value>,
        _matching_message: &IncomingMessage,
    ) -> Result<Option<Value>, DriverError> {
        Ok(None)
    }
}

/// Builds a fresh driver instance for one request body.
pub type DriverFactory = Box<dyn Fn(&[u8]) -> Box<dyn Driver> + Send + Sync>;

/// Registered driver factories, tried in registration order.
///
/// The registry holds no per-turn state: every `match_request` call builds
/// fresh driver instances, so concurrent requests never share a driver.
#[derive(Default)]
pub struct DriverRegistry {
    factories: Vec<DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn(&[u8]) -> Box<dyn Driver> + Send + Sync + 'static,
    {
        self.factories.push(Box::new(factory));
    }

    /// First registered driver that recognizes the request, or `None` when
    /// the request belongs to no known protocol.
    pub fn match_request(&self, raw_body: &[u8]) -> Option<Box<dyn Driver>> {
        self.factories.iter().map(|factory| factory(raw_body)).find(|driver| {
            driver.matches_request()
        })
    }

    pub fn driver_count(&self) -> usize {
        self.factories.len()
    }
}
