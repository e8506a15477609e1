//! Layered configuration: built-in defaults, then `config/default.toml`
//! (optional), then `RELAY_`-prefixed environment variables such as
//! `RELAY_BROKER__FRONTEND` or `RELAY_LOG__LEVEL`.

mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, LogSettings, Settings};

const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Loads the configuration from the default file and environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(None)
}

/// Loads the configuration, reading `path` instead of `config/default`
/// when given. An explicit path must exist; the default one is optional.
pub fn load_config_from(path: Option<&str>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(p) => File::with_name(p).required(true),
        None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
    };

    let builder = Config::builder().add_source(file).add_source(
        Environment::with_prefix("RELAY")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    let settings = Settings {
        broker: BrokerSettings {
            frontend: partial
                .broker
                .as_ref()
                .and_then(|b| b.frontend.clone())
                .unwrap_or(default.broker.frontend),
            backend: partial
                .broker
                .as_ref()
                .and_then(|b| b.backend.clone())
                .unwrap_or(default.broker.backend),
            max_connections: partial
                .broker
                .as_ref()
                .and_then(|b| b.max_connections)
                .unwrap_or(default.broker.max_connections),
            intake_capacity: partial
                .broker
                .as_ref()
                .and_then(|b| b.intake_capacity)
                .unwrap_or(default.broker.intake_capacity),
            send_capacity: partial
                .broker
                .as_ref()
                .and_then(|b| b.send_capacity)
                .unwrap_or(default.broker.send_capacity),
        },
        log: LogSettings {
            level: partial
                .log
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.log.level),
        },
    };

    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let broker = &settings.broker;
    if broker.intake_capacity == 0 {
        return Err(ConfigError::Message(
            "broker.intake_capacity must be at least 1".to_string(),
        ));
    }
    if broker.send_capacity == 0 {
        return Err(ConfigError::Message(
            "broker.send_capacity must be at least 1".to_string(),
        ));
    }
    if broker.max_connections == 0 {
        return Err(ConfigError::Message(
            "broker.max_connections must be at least 1".to_string(),
        ));
    }
    Ok(())
}
