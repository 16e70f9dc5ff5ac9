//! The bot-logic seam: the webhook route hands every normalized message to
//! a [`BotHandler`] and renders whatever replies come back.

use async_trait::async_trait;
use thiserror::Error;

use banter_core::driver::BotReply;
use banter_core::messages::IncomingMessage;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("bot handler failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait BotHandler: Send + Sync {
    async fn on_message(&self, message: &IncomingMessage) -> Result<Vec<BotReply>, HandlerError>;
}

/// Default handler wired by bootstrap: echoes the detected intent back as
/// a single text reply. Deployments replace this with their own logic.
pub struct EchoHandler;

#[async_trait]
impl BotHandler for EchoHandler {
    async fn on_message(&self, message: &IncomingMessage) -> Result<Vec<BotReply>, HandlerError> {
        Ok(vec![BotReply::text(message.text())])
    }
}
