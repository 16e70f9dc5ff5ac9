//! Conversational-action replies: the structured, voice-assistant style
//! payload that rides in the response `payload` object instead of the
//! fulfillment message list.

use serde_json::{json, Value};

/// Provider key the action payload is nested under in the response.
pub const ACTION_PAYLOAD_KEY: &str = "google";

/// An Actions-on-Google conversation reply for one turn.
///
/// In practice mutually exclusive with other visible reply kinds: the
/// accumulator keeps the last conversation set and renders it alongside
/// whatever fulfillment messages were added, leaving precedence to the
/// provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionConversation {
    responses: Vec<SimpleResponse>,
    expect_user_response: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SimpleResponse {
    text_to_speech: String,
    display_text: Option<String>,
}

impl ActionConversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Say `text` and keep the microphone open for the user's answer.
    pub fn ask(mut self, text: impl Into<String>) -> Self {
        self.responses.push(SimpleResponse { text_to_speech: text.into(), display_text: None });
        self.expect_user_response = true;
        self
    }

    /// Say `text` and end the conversation.
    pub fn close(mut self, text: impl Into<String>) -> Self {
        self.responses.push(SimpleResponse { text_to_speech: text.into(), display_text: None });
        self.expect_user_response = false;
        self
    }

    /// Attach a display variant to the most recent response.
    pub fn display(mut self, text: impl Into<String>) -> Self {
        if let Some(last) = self.responses.last_mut() {
            last.display_text = Some(text.into());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn expects_user_response(&self) -> bool {
        self.expect_user_response
    }

    /// The response `payload` object for this conversation.
    pub fn render(&self) -> Value {
        let items: Vec<Value> = self
            .responses
            .iter()
            .map(|response| {
                let mut simple = json!({"textToSpeech": response.text_to_speech});
                if let Some(display_text) = &response.display_text {
                    simple["displayText"] = Value::String(display_text.clone());
                }
                json!({"simpleResponse": simple})
            })
            .collect();

        json!({
            (ACTION_PAYLOAD_KEY): {
                "expectUserResponse": self.expect_user_response,
                "richResponse": {"items": items}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ActionConversation;

    #[test]
    fn ask_keeps_the_conversation_open() {
        let conversation = ActionConversation::new().ask("What color?");

        assert!(conversation.expects_user_response());
        assert_eq!(
            conversation.render(),
            json!({
                "google": {
                    "expectUserResponse": true,
                    "richResponse": {
                        "items": [{"simpleResponse": {"textToSpeech": "What color?"}}]
                    }
                }
            })
        );
    }

    #[test]
    fn close_ends_the_conversation() {
        let conversation = ActionConversation::new().close("Goodbye");

        assert!(!conversation.expects_user_response());
        let rendered = conversation.render();
        assert_eq!(rendered["google"]["expectUserResponse"], json!(false));
    }

    #[test]
    fn display_text_attaches_to_the_latest_response() {
        let conversation = ActionConversation::new().ask("Pick a color").display("🎨 Pick a color");

        assert_eq!(
            conversation.render()["google"]["richResponse"]["items"][0]["simpleResponse"],
            json!({"textToSpeech": "Pick a color", "displayText": "🎨 Pick a color"})
        );
    }

    #[test]
    fn responses_render_in_insertion_order() {
        let conversation = ActionConversation::new().ask("First").ask("Second");
        let items = &conversation.render()["google"]["richResponse"]["items"];

        assert_eq!(items[0]["simpleResponse"]["textToSpeech"], json!("First"));
        assert_eq!(items[1]["simpleResponse"]["textToSpeech"], json!("Second"));
    }
}
