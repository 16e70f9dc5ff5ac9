//! HTTP host for the banter webhook drivers: bootstrap, the webhook
//! endpoint, the bot-handler seam, and a liveness endpoint.

pub mod bootstrap;
pub mod handler;
pub mod health;
pub mod webhook;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use handler::{BotHandler, EchoHandler, HandlerError};
pub use webhook::WebhookState;
