use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use banter_core::config::{AppConfig, ConfigError, LoadOptions};
use banter_core::driver::DriverRegistry;
use banter_dialogflow::{DialogflowDriver, DRIVER_NAME};

use crate::handler::{BotHandler, EchoHandler};
use crate::webhook::WebhookState;

pub struct Application {
    pub config: AppConfig,
    pub registry: Arc<DriverRegistry>,
    pub handler: Arc<dyn BotHandler>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no drivers are enabled; the webhook endpoint would reject every request")]
    NoDriversEnabled,
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let mut registry = DriverRegistry::new();
    if config.dialogflow.enabled {
        registry.register(|raw_body| Box::new(DialogflowDriver::from_request(raw_body)));
        info!(
            event_name = "system.bootstrap.driver_registered",
            correlation_id = "bootstrap",
            driver = DRIVER_NAME,
            "webhook driver registered"
        );
    }

    if registry.driver_count() == 0 {
        return Err(BootstrapError::NoDriversEnabled);
    }

    Ok(Application {
        config,
        registry: Arc::new(registry),
        handler: Arc::new(EchoHandler),
    })
}

impl Application {
    pub fn webhook_state(&self) -> WebhookState {
        WebhookState { registry: Arc::clone(&self.registry), handler: Arc::clone(&self.handler) }
    }

    /// Swap in deployment-specific bot logic before serving.
    pub fn with_handler(mut self, handler: Arc<dyn BotHandler>) -> Self {
        self.handler = handler;
        self
    }
}

#[cfg(test)]
mod tests {
    use banter_core::config::{ConfigOverrides, LoadOptions};

    use super::{bootstrap, BootstrapError};

    #[test]
    fn bootstrap_registers_the_dialogflow_driver_by_default() {
        let app = bootstrap(LoadOptions::default()).expect("bootstrap");
        assert_eq!(app.registry.driver_count(), 1);
    }

    #[test]
    fn bootstrap_fails_fast_when_every_driver_is_disabled() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                dialogflow_enabled: Some(false),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(BootstrapError::NoDriversEnabled)));
    }

    #[test]
    fn matched_driver_instances_are_per_request() {
        let app = bootstrap(LoadOptions::default()).expect("bootstrap");
        let body = br#"{"queryResult": {}, "session": "s"}"#;

        let first = app.registry.match_request(body).expect("first match");
        let second = app.registry.match_request(body).expect("second match");

        // Two boxes, two turns: no shared per-turn state.
        assert_eq!(first.name(), second.name());
    }
}
