//! Runtime-side message model shared by all drivers.
//!
//! An inbound webhook call is normalized into an [`IncomingMessage`]; bot
//! logic answers with [`OutgoingMessage`] values (or raw driver payloads, see
//! [`crate::driver::BotReply`]). Both sides are plain data: all per-turn
//! state lives in the driver instance that owns the turn.

use std::collections::BTreeMap;

use serde_json::Value;

/// A normalized incoming message, produced once per webhook request.
///
/// `text` carries the detected intent name rather than the literal user
/// utterance: the NLU provider has already classified the input before it
/// reaches a driver. Provider metadata (detected parameters, active
/// contexts, proposed fulfillment messages) travels in `extras`.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingMessage {
    text: String,
    sender: Option<String>,
    recipient: String,
    extras: BTreeMap<String, Value>,
}

impl IncomingMessage {
    pub fn new(
        text: impl Into<String>,
        sender: Option<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender,
            recipient: recipient.into(),
            extras: BTreeMap::new(),
        }
    }

    /// Attach a piece of driver metadata. Extras are set once during
    /// normalization; the message is read-only afterwards.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Channel-specific user id, when the provider forwarded one.
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Conversation/session identifier the reply should be addressed to.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }
}

/// One reply turn produced by bot logic: a text body plus an optional
/// attachment. Drivers translate this into their wire format; kinds a
/// driver cannot express are dropped by that driver, not here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    text: String,
    attachment: Option<Attachment>,
}

impl OutgoingMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), attachment: None }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }
}

/// Attachment kinds the runtime understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attachment {
    Image { url: String },
    Audio { url: String },
    Video { url: String },
    File { url: String },
}

impl Attachment {
    pub fn image(url: impl Into<String>) -> Self {
        Self::Image { url: url.into() }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Image { url } | Self::Audio { url } | Self::Video { url } | Self::File { url } => {
                url
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Audio { .. } => "audio",
            Self::Video { .. } => "video",
            Self::File { .. } => "file",
        }
    }
}

/// Identity record for the author of an incoming message. Webhook NLU
/// providers often omit the user id entirely, so everything is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    id: Option<String>,
}

impl User {
    pub fn new(id: Option<String>) -> Self {
        Self { id }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// A free-form answer derived from an incoming message, used when the bot
/// is mid-conversation and expects a direct reply rather than intent
/// routing.
#[derive(Clone, Debug, PartialEq)]
pub struct Answer {
    text: String,
    message: IncomingMessage,
}

impl Answer {
    pub fn from_message(message: IncomingMessage) -> Self {
        Self { text: message.text().to_owned(), message }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn message(&self) -> &IncomingMessage {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Answer, Attachment, IncomingMessage, OutgoingMessage, User};

    #[test]
    fn incoming_message_exposes_extras_by_key() {
        let message = IncomingMessage::new("order.lookup", Some("U1".to_owned()), "session-1")
            .with_extra("apiAction", json!("lookup"))
            .with_extra("apiParameters", json!({"order_id": "A-17"}));

        assert_eq!(message.text(), "order.lookup");
        assert_eq!(message.sender(), Some("U1"));
        assert_eq!(message.recipient(), "session-1");
        assert_eq!(message.extra("apiAction"), Some(&json!("lookup")));
        assert_eq!(message.extra("missing"), None);
    }

    #[test]
    fn outgoing_message_carries_optional_attachment() {
        let plain = OutgoingMessage::new("hello");
        assert_eq!(plain.attachment(), None);

        let illustrated = OutgoingMessage::new("hello")
            .with_attachment(Attachment::image("http://x/y.png"));
        let attachment = illustrated.attachment().expect("attachment");
        assert_eq!(attachment.url(), "http://x/y.png");
        assert_eq!(attachment.kind(), "image");
    }

    #[test]
    fn answer_mirrors_the_message_text() {
        let message = IncomingMessage::new("blue", None, "session-1");
        let answer = Answer::from_message(message.clone());

        assert_eq!(answer.text(), "blue");
        assert_eq!(answer.message(), &message);
    }

    #[test]
    fn user_defaults_to_anonymous() {
        assert_eq!(User::default().id(), None);
        assert_eq!(User::new(Some("U1".to_owned())).id(), Some("U1"));
    }
}
