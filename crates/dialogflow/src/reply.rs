//! Reply accumulation: collects the bot's outgoing items for one turn and
//! renders them into a single webhook response.
//!
//! The accumulator is per-turn state. `render` consumes it, so a rendered
//! turn cannot be appended to or rendered twice.

use serde_json::Value;
use thiserror::Error;

use banter_core::messages::{Attachment, OutgoingMessage};

use crate::action::ActionConversation;
use crate::messages::{Context, RichMessage, WebhookResponse};

/// One outgoing reply item. A closed set: anything the bot hands us must
/// classify as one of these or the add fails loudly.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Text(String),
    Media { url: String },
    Rich(RichMessage),
    Action(ActionConversation),
    Context(Context),
}

#[derive(Debug, Error, PartialEq)]
pub enum ReplyError {
    /// The value is neither a string, a context-like object, nor a
    /// recognized rich/action payload. Never swallowed: a dropped reply
    /// would corrupt the conversation.
    #[error("invalid message kind: {found}")]
    InvalidMessageKind { found: String },
}

/// Classify a raw JSON reply by shape, in the dispatch priority the
/// protocol expects: context-like objects first, then plain strings, then
/// recognized rich shapes.
pub fn classify_reply(value: Value) -> Result<Reply, ReplyError> {
    match value {
        Value::String(text) => Ok(Reply::Text(text)),
        Value::Object(map) => {
            if map.contains_key("name") {
                return serde_json::from_value(Value::Object(map))
                    .map(Reply::Context)
                    .map_err(|_| ReplyError::InvalidMessageKind {
                        found: "malformed context object".to_owned(),
                    });
            }

            serde_json::from_value(Value::Object(map))
                .map(Reply::Rich)
                .map_err(|_| ReplyError::InvalidMessageKind {
                    found: "unrecognized object shape".to_owned(),
                })
        }
        Value::Number(_) => Err(invalid("number")),
        Value::Bool(_) => Err(invalid("boolean")),
        Value::Array(_) => Err(invalid("array")),
        Value::Null => Err(invalid("null")),
    }
}

fn invalid(found: &str) -> ReplyError {
    ReplyError::InvalidMessageKind { found: found.to_owned() }
}

/// Ordered reply state for one turn: visible fulfillment messages,
/// outgoing contexts (upserted by short name), and at most one
/// conversational-action payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplyAccumulator {
    session: String,
    messages: Vec<RichMessage>,
    contexts: Vec<Context>,
    conversation: Option<ActionConversation>,
}

impl ReplyAccumulator {
    pub fn new(session: impl Into<String>) -> Self {
        Self { session: session.into(), ..Self::default() }
    }

    /// Add one typed reply item. Contexts register without producing a
    /// visible message; everything else appends in call order.
    pub fn add_reply(&mut self, reply: Reply) -> &mut Self {
        match reply {
            Reply::Context(context) => self.set_outgoing_context(context),
            Reply::Text(text) => self.push_message(RichMessage::text(text)),
            Reply::Media { url } => self.push_message(RichMessage::image(url)),
            Reply::Rich(message) => self.push_message(message),
            Reply::Action(conversation) => {
                self.conversation = Some(conversation);
                self
            }
        }
    }

    /// Classify and add a raw JSON reply. On failure the accumulator is
    /// untouched.
    pub fn add_value(&mut self, value: Value) -> Result<&mut Self, ReplyError> {
        let reply = classify_reply(value)?;
        Ok(self.add_reply(reply))
    }

    /// Translate a runtime outgoing message: the text body first, then an
    /// image item when the attachment is an image. Other attachment kinds
    /// have no counterpart in this protocol and are skipped.
    pub fn add_outgoing(&mut self, message: &OutgoingMessage) -> &mut Self {
        self.push_message(RichMessage::text(message.text()));

        match message.attachment() {
            Some(Attachment::Image { url }) => {
                self.push_message(RichMessage::image(url.clone()));
            }
            Some(other) => {
                tracing::debug!(
                    attachment_kind = other.kind(),
                    "attachment kind has no fulfillment translation, skipping"
                );
            }
            None => {}
        }

        self
    }

    /// Register an outgoing context, replacing any existing context with
    /// the same short name.
    pub fn set_outgoing_context(&mut self, context: Context) -> &mut Self {
        if let Some(existing) = self
            .contexts
            .iter_mut()
            .find(|candidate| candidate.short_name() == context.short_name())
        {
            *existing = context;
        } else {
            self.contexts.push(context);
        }
        self
    }

    fn push_message(&mut self, message: RichMessage) -> &mut Self {
        self.messages.push(message);
        self
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.contexts.is_empty() && self.conversation.is_none()
    }

    /// Render the accumulated turn. Consumes the accumulator: a rendered
    /// turn is terminal.
    pub fn render(self) -> WebhookResponse {
        let session = self.session;
        let output_contexts = self
            .contexts
            .into_iter()
            .map(|context| {
                let name = context.qualified_name(&session);
                Context { name, ..context }
            })
            .collect();

        WebhookResponse {
            fulfillment_messages: self.messages,
            output_contexts,
            payload: self.conversation.map(|conversation| conversation.render()),
        }
    }
}
