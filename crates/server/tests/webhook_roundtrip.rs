//! End-to-end turn: bootstrap the application, post a detect-intent
//! request at the webhook router, and check the rendered response.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use banter_core::config::{ConfigOverrides, LoadOptions};
use banter_core::driver::BotReply;
use banter_core::messages::{Attachment, IncomingMessage, OutgoingMessage};
use banter_server::handler::{BotHandler, HandlerError};
use banter_server::{bootstrap, webhook};

fn load_options() -> LoadOptions {
    LoadOptions {
        overrides: ConfigOverrides {
            dialogflow_enabled: Some(true),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    }
}

fn detect_intent_request() -> Value {
    json!({
        "queryResult": {
            "fulfillmentMessages": [{"text": {"text": ["Suggested reply"]}}],
            "parameters": {"color": "blue"},
            "outputContexts": [],
            "intent": {"displayName": "color.pick"},
            "action": "pick"
        },
        "originalDetectIntentRequest": {
            "payload": {"user": {"userId": "U1"}}
        },
        "session": "projects/p/agent/sessions/s1"
    })
}

async fn post_webhook(
    state: webhook::WebhookState,
    body: Value,
) -> (StatusCode, Value) {
    let response = webhook::router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let payload = serde_json::from_slice(&bytes).expect("json body");
    (status, payload)
}

#[tokio::test]
async fn echo_turn_round_trips_the_detected_intent() {
    let app = bootstrap(load_options()).expect("bootstrap");

    let (status, payload) = post_webhook(app.webhook_state(), detect_intent_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["fulfillmentMessages"], json!([{"text": {"text": ["color.pick"]}}]));
    assert!(payload.get("outputContexts").is_none());
}

#[tokio::test]
async fn full_reply_turn_renders_messages_contexts_in_order() {
    struct ColorBot;

    #[async_trait]
    impl BotHandler for ColorBot {
        async fn on_message(
            &self,
            message: &IncomingMessage,
        ) -> Result<Vec<BotReply>, HandlerError> {
            assert_eq!(message.sender(), Some("U1"));
            Ok(vec![
                BotReply::Message(
                    OutgoingMessage::new("Here is the palette")
                        .with_attachment(Attachment::image("http://x/palette.png")),
                ),
                BotReply::Raw(json!({"name": "awaiting_color", "lifespanCount": 2})),
            ])
        }
    }

    let app = bootstrap(load_options()).expect("bootstrap").with_handler(Arc::new(ColorBot));

    let (status, payload) = post_webhook(app.webhook_state(), detect_intent_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        payload["fulfillmentMessages"],
        json!([
            {"text": {"text": ["Here is the palette"]}},
            {"image": {"imageUri": "http://x/palette.png"}}
        ])
    );
    assert_eq!(
        payload["outputContexts"],
        json!([{
            "name": "projects/p/agent/sessions/s1/contexts/awaiting_color",
            "lifespanCount": 2
        }])
    );
}

#[tokio::test]
async fn foreign_webhook_is_routed_away_with_404() {
    let app = bootstrap(load_options()).expect("bootstrap");

    let (status, payload) =
        post_webhook(app.webhook_state(), json!({"object": "page", "entry": []})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(payload["error"], json!("no driver matched the request"));
}

#[tokio::test]
async fn legacy_v1_body_still_matches_the_driver() {
    let app = bootstrap(load_options()).expect("bootstrap");

    let (status, payload) = post_webhook(
        app.webhook_state(),
        json!({
            "result": {"metadata": {"intentName": "greet"}, "action": "say.hello"},
            "sessionId": "legacy-1"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["fulfillmentMessages"], json!([{"text": {"text": ["greet"]}}]));
}
