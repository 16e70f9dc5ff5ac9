pub mod config;
pub mod driver;
pub mod messages;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use driver::{
    BotReply, Driver, DriverError, DriverFactory, DriverRegistry, RespondError, TurnResponse,
};
pub use messages::{Answer, Attachment, IncomingMessage, OutgoingMessage, User};
