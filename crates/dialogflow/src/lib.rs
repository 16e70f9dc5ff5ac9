//! Dialogflow webhook driver - request/response translation
//!
//! This crate is the translation layer between the banter runtime and a
//! Dialogflow fulfillment webhook:
//! - **Envelope** (`envelope`) - lenient body decoding + protocol matching
//! - **Agent** (`agent`) - the parsed detect-intent envelope and its accessors
//! - **Messages** (`messages`) - fulfillment wire shapes (text, image, card, ...)
//! - **Replies** (`reply`) - per-turn accumulation of outgoing reply items
//! - **Driver** (`driver`) - the `banter_core::Driver` implementation
//!
//! # Architecture
//!
//! ```text
//! HTTP body → DialogflowDriver → IncomingMessage → bot logic
//!                                                      ↓
//! HTTP 200 ← WebhookResponse ← ReplyAccumulator ← BotReply items
//! ```
//!
//! One driver instance owns one turn. Parsing happens eagerly at
//! construction and degrades gracefully (a broken secondary structure never
//! rejects the turn); reply handling is strict (an unrecognized reply kind
//! fails the add instead of being dropped).
//!
//! # Key Types
//!
//! - `DialogflowDriver` - per-request driver, normalization + reply rendering
//! - `WebhookAgent` - detect-intent envelope accessor
//! - `ReplyAccumulator` - ordered reply builder, consumed by `render`
//! - `RichMessage` / `Context` - wire model of the webhook response

pub mod action;
pub mod agent;
pub mod driver;
pub mod envelope;
pub mod messages;
pub mod reply;

pub use action::ActionConversation;
pub use agent::{EnvelopeError, WebhookAgent};
pub use driver::{DialogflowDriver, DRIVER_NAME};
pub use envelope::{ProtocolVersion, RawPayload};
pub use messages::{
    CardBuilder, CardButton, Context, RenderError, RichMessage, WebhookResponse,
};
pub use reply::{classify_reply, Reply, ReplyAccumulator, ReplyError};
