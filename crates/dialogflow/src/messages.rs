//! Fulfillment wire model: the message and context shapes the webhook
//! protocol exchanges, with builder helpers for the rich kinds.
//!
//! Serialization is the contract here — every variant must produce the
//! exact field layout the provider documents, which the tests pin down
//! against JSON literals.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// One fulfillment message: a unit of bot reply content as understood by
/// the webhook protocol. The wrapping single-field structs give each
/// variant its wire shape, so the enum itself stays untagged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RichMessage {
    Text { text: TextBody },
    Image { image: ImageBody },
    Card { card: CardBody },
    Suggestions {
        #[serde(rename = "quickReplies")]
        quick_replies: SuggestionsBody,
    },
    Payload { payload: Value },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    pub text: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBody {
    pub image_uri: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBody {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<CardButton>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardButton {
    pub text: String,
    pub postback: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub quick_replies: Vec<String>,
}

impl RichMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { text: TextBody { text: vec![body.into()] } }
    }

    pub fn image(image_uri: impl Into<String>) -> Self {
        Self::Image { image: ImageBody { image_uri: image_uri.into() } }
    }

    pub fn card(card: CardBody) -> Self {
        Self::Card { card }
    }

    pub fn suggestions(title: Option<String>, quick_replies: Vec<String>) -> Self {
        Self::Suggestions { quick_replies: SuggestionsBody { title, quick_replies } }
    }

    pub fn payload(payload: Value) -> Self {
        Self::Payload { payload }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Card { .. } => "card",
            Self::Suggestions { .. } => "quickReplies",
            Self::Payload { .. } => "payload",
        }
    }
}

/// Builder for card messages, chained like the other rich constructors.
#[derive(Clone, Debug)]
pub struct CardBuilder {
    card: CardBody,
}

impl CardBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            card: CardBody {
                title: title.into(),
                subtitle: None,
                image_uri: None,
                buttons: Vec::new(),
            },
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.card.subtitle = Some(subtitle.into());
        self
    }

    pub fn image_uri(mut self, image_uri: impl Into<String>) -> Self {
        self.card.image_uri = Some(image_uri.into());
        self
    }

    pub fn button(mut self, text: impl Into<String>, postback: impl Into<String>) -> Self {
        self.card.buttons.push(CardButton { text: text.into(), postback: postback.into() });
        self
    }

    pub fn build(self) -> RichMessage {
        RichMessage::Card { card: self.card }
    }
}

/// A named piece of conversation state the provider tracks across turns.
///
/// Context names on the wire are full resource paths; outgoing contexts may
/// be set with a short name and are qualified against the session at render
/// time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), lifespan_count: None, parameters: Map::new() }
    }

    pub fn lifespan(mut self, lifespan_count: u32) -> Self {
        self.lifespan_count = Some(lifespan_count);
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Short name without the session path prefix, used for upserts: an
    /// outgoing context replaces an existing one of the same short name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Full resource path of this context under `session`. Names that are
    /// already paths pass through unchanged.
    pub fn qualified_name(&self, session: &str) -> String {
        if self.name.contains('/') || session.is_empty() {
            self.name.clone()
        } else {
            format!("{session}/contexts/{name}", name = self.name)
        }
    }
}

/// The accumulated response for one turn, serialized as the webhook
/// response body.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_messages: Vec<RichMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<Context>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize webhook response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WebhookResponse {
    /// The response body as a JSON string. A failure here is fatal for the
    /// turn; callers must not send a partial response.
    pub fn to_body(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CardBuilder, Context, RichMessage, WebhookResponse};

    #[test]
    fn text_message_matches_the_wire_shape() {
        let value = serde_json::to_value(RichMessage::text("hello")).expect("serialize");
        assert_eq!(value, json!({"text": {"text": ["hello"]}}));
    }

    #[test]
    fn image_message_matches_the_wire_shape() {
        let value = serde_json::to_value(RichMessage::image("http://x/y.png")).expect("serialize");
        assert_eq!(value, json!({"image": {"imageUri": "http://x/y.png"}}));
    }

    #[test]
    fn card_message_omits_absent_fields() {
        let card = CardBuilder::new("Specials")
            .subtitle("Today only")
            .button("Order", "order.start")
            .build();
        let value = serde_json::to_value(card).expect("serialize");

        assert_eq!(
            value,
            json!({
                "card": {
                    "title": "Specials",
                    "subtitle": "Today only",
                    "buttons": [{"text": "Order", "postback": "order.start"}]
                }
            })
        );
    }

    #[test]
    fn suggestions_message_matches_the_wire_shape() {
        let message =
            RichMessage::suggestions(Some("Pick one".to_owned()), vec!["red".into(), "blue".into()]);
        let value = serde_json::to_value(message).expect("serialize");

        assert_eq!(
            value,
            json!({
                "quickReplies": {
                    "title": "Pick one",
                    "quickReplies": ["red", "blue"]
                }
            })
        );
    }

    #[test]
    fn rich_message_deserializes_by_shape() {
        let text: RichMessage =
            serde_json::from_value(json!({"text": {"text": ["hi"]}})).expect("text");
        assert_eq!(text.kind(), "text");

        let image: RichMessage =
            serde_json::from_value(json!({"image": {"imageUri": "http://x/y.png"}}))
                .expect("image");
        assert_eq!(image.kind(), "image");

        let payload: RichMessage =
            serde_json::from_value(json!({"payload": {"telegram": {"text": "hi"}}}))
                .expect("payload");
        assert_eq!(payload.kind(), "payload");
    }

    #[test]
    fn context_qualifies_short_names_against_the_session() {
        let context = Context::new("awaiting_color").lifespan(2);
        let session = "projects/p/agent/sessions/s1";

        assert_eq!(
            context.qualified_name(session),
            "projects/p/agent/sessions/s1/contexts/awaiting_color"
        );
        assert_eq!(context.short_name(), "awaiting_color");
    }

    #[test]
    fn context_keeps_full_paths_unchanged() {
        let context = Context::new("projects/p/agent/sessions/s1/contexts/known");
        assert_eq!(
            context.qualified_name("projects/p/agent/sessions/s2"),
            "projects/p/agent/sessions/s1/contexts/known"
        );
        assert_eq!(context.short_name(), "known");
    }

    #[test]
    fn response_serializes_messages_contexts_and_payload() {
        let response = WebhookResponse {
            fulfillment_messages: vec![RichMessage::text("hi")],
            output_contexts: vec![Context::new("s/contexts/c").lifespan(5)],
            payload: Some(json!({"google": {"expectUserResponse": true}})),
        };
        let value = serde_json::to_value(&response).expect("serialize");

        assert_eq!(
            value,
            json!({
                "fulfillmentMessages": [{"text": {"text": ["hi"]}}],
                "outputContexts": [{"name": "s/contexts/c", "lifespanCount": 5}],
                "payload": {"google": {"expectUserResponse": true}}
            })
        );
    }

    #[test]
    fn empty_response_serializes_to_messages_only() {
        let body = WebhookResponse::default().to_body().expect("serialize");
        assert_eq!(body, r#"{"fulfillmentMessages":[]}"#);
    }
}
