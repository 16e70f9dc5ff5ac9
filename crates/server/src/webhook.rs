//! The webhook endpoint: one HTTP request is one conversation turn.
//!
//! Routing policy mirrors the error taxonomy of the translation layer: a
//! request no driver recognizes is answered 404 so the caller can route it
//! elsewhere; a reply the driver rejects or a response that fails to
//! serialize is a 500, because both mean the turn cannot be answered
//! correctly.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use banter_core::driver::{DriverRegistry, RespondError};

use crate::handler::BotHandler;

#[derive(Clone)]
pub struct WebhookState {
    pub registry: Arc<DriverRegistry>,
    pub handler: Arc<dyn BotHandler>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new().route("/webhook", post(webhook)).with_state(state)
}

pub async fn webhook(State(state): State<WebhookState>, body: Bytes) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let Some(driver) = state.registry.match_request(&body) else {
        info!(
            event_name = "webhook.request.unmatched",
            correlation_id = %correlation_id,
            body_bytes = body.len(),
            "no registered driver recognized the request"
        );
        return error_response(
            StatusCode::NOT_FOUND,
            "no driver matched the request",
            &correlation_id,
        );
    };

    info!(
        event_name = "webhook.request.matched",
        correlation_id = %correlation_id,
        driver = driver.name(),
        "dispatching webhook turn"
    );

    let mut replies = Vec::new();
    for message in driver.messages() {
        match state.handler.on_message(message).await {
            Ok(batch) => replies.extend(batch),
            Err(handler_error) => {
                error!(
                    event_name = "webhook.handler.failed",
                    correlation_id = %correlation_id,
                    driver = driver.name(),
                    error = %handler_error,
                    "bot handler failed, aborting the turn"
                );
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "bot handler failed",
                    &correlation_id,
                );
            }
        }
    }

    match driver.build_turn_response(replies) {
        Ok(turn) => {
            info!(
                event_name = "webhook.turn.rendered",
                correlation_id = %correlation_id,
                driver = driver.name(),
                status = turn.status,
                "webhook turn rendered"
            );
            let status = StatusCode::from_u16(turn.status).unwrap_or(StatusCode::OK);
            (status, [(header::CONTENT_TYPE, turn.content_type)], turn.body).into_response()
        }
        Err(respond_error) => {
            error!(
                event_name = "webhook.turn.failed",
                correlation_id = %correlation_id,
                driver = driver.name(),
                error = %respond_error,
                "webhook turn could not be rendered"
            );
            let detail = match respond_error {
                RespondError::InvalidReply { .. } => "bot produced an invalid reply",
                RespondError::Serialization(_) => "response serialization failed",
            };
            error_response(StatusCode::INTERNAL_SERVER_ERROR, detail, &correlation_id)
        }
    }
}

fn error_response(status: StatusCode, detail: &str, correlation_id: &str) -> Response {
    (status, Json(json!({"error": detail, "correlation_id": correlation_id}))).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use banter_core::driver::{BotReply, DriverRegistry};
    use banter_core::messages::IncomingMessage;
    use banter_dialogflow::DialogflowDriver;

    use super::{router, WebhookState};
    use crate::handler::{BotHandler, EchoHandler, HandlerError};

    fn dialogflow_state(handler: Arc<dyn BotHandler>) -> WebhookState {
        let mut registry = DriverRegistry::new();
        registry.register(|raw| Box::new(DialogflowDriver::from_request(raw)));
        WebhookState { registry: Arc::new(registry), handler }
    }

    fn detect_intent_body() -> String {
        json!({
            "queryResult": {
                "intent": {"displayName": "color.pick"},
                "action": "pick"
            },
            "session": "projects/p/agent/sessions/s1"
        })
        .to_string()
    }

    async fn post_webhook(state: WebhookState, body: String) -> (StatusCode, Value) {
        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    #[tokio::test]
    async fn matched_request_round_trips_through_the_driver() {
        let (status, body) =
            post_webhook(dialogflow_state(Arc::new(EchoHandler)), detect_intent_body()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["fulfillmentMessages"],
            json!([{"text": {"text": ["color.pick"]}}])
        );
    }

    #[tokio::test]
    async fn unmatched_request_is_answered_404() {
        let (status, body) = post_webhook(
            dialogflow_state(Arc::new(EchoHandler)),
            json!({"update_id": 9}).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("no driver matched the request"));
    }

    struct BrokenReplyHandler;

    #[async_trait]
    impl BotHandler for BrokenReplyHandler {
        async fn on_message(
            &self,
            _message: &IncomingMessage,
        ) -> Result<Vec<BotReply>, HandlerError> {
            Ok(vec![BotReply::Raw(json!(42))])
        }
    }

    #[tokio::test]
    async fn invalid_reply_surfaces_as_a_server_error() {
        let (status, body) =
            post_webhook(dialogflow_state(Arc::new(BrokenReplyHandler)), detect_intent_body())
                .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!("bot produced an invalid reply"));
    }

    struct FailingHandler;

    #[async_trait]
    impl BotHandler for FailingHandler {
        async fn on_message(
            &self,
            _message: &IncomingMessage,
        ) -> Result<Vec<BotReply>, HandlerError> {
            Err(HandlerError::Failed("downstream unavailable".to_owned()))
        }
    }

    #[tokio::test]
    async fn handler_failure_surfaces_as_a_server_error() {
        let (status, body) =
            post_webhook(dialogflow_state(Arc::new(FailingHandler)), detect_intent_body()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!("bot handler failed"));
    }

    #[tokio::test]
    async fn context_replies_land_in_output_contexts() {
        struct ContextHandler;

        #[async_trait]
        impl BotHandler for ContextHandler {
            async fn on_message(
                &self,
                _message: &IncomingMessage,
            ) -> Result<Vec<BotReply>, HandlerError> {
                Ok(vec![
                    BotReply::text("noted"),
                    BotReply::Raw(json!({"name": "awaiting_color", "lifespanCount": 2})),
                ])
            }
        }

        let (status, body) =
            post_webhook(dialogflow_state(Arc::new(ContextHandler)), detect_intent_body()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["outputContexts"][0]["name"],
            json!("projects/p/agent/sessions/s1/contexts/awaiting_color")
        );
    }
}
