use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the relay broker and for logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub log: LogSettings,
}

/// Configuration handed to a `Broker` at construction.
///
/// This is the broker's entire configuration surface; nothing is read from
/// process-wide state once the broker exists.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    /// Intake address publishers connect to, e.g. `tcp://*:5555`.
    pub frontend: String,
    /// Distribution address subscribers connect to, e.g. `tcp://*:5556`.
    pub backend: String,
    /// Connections accepted per endpoint before new ones are refused.
    pub max_connections: usize,
    /// Messages buffered between publishers and the relay loop.
    pub intake_capacity: usize,
    /// Messages a subscriber may fall behind before it starts losing them.
    pub send_capacity: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub frontend: Option<String>,
    pub backend: Option<String>,
    pub max_connections: Option<usize>,
    pub intake_capacity: Option<usize>,
    pub send_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            frontend: "tcp://127.0.0.1:5555".to_string(),
            backend: "tcp://127.0.0.1:5556".to_string(),
            max_connections: 1024,
            intake_capacity: 1000,
            send_capacity: 1000,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl BrokerSettings {
    pub fn with_addresses(frontend: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            frontend: frontend.into(),
            backend: backend.into(),
            ..Self::default()
        }
    }
}
