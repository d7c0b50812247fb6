use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    /// Seconds between two heartbeat sweeps
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Consecutive unanswered probes tolerated before a connection is evicted
    #[serde(default = "default_max_missed_probes")]
    pub max_missed_probes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Status endpoint; transitions are only logged when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_interval_secs() -> u64 {
    10
}

fn default_max_missed_probes() -> u32 {
    2
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("heartbeat.interval_secs", default_interval_secs() as i64)?
            .set_default("heartbeat.max_missed_probes", default_max_missed_probes() as i64)?
            .set_default("notifier.timeout_ms", default_timeout_ms() as i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, HEARTBEAT__INTERVAL_SECS, NOTIFIER__ENDPOINT, ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            // Legacy variable name for the status endpoint
            .set_override_option("notifier.endpoint", env::var("API_ENDPOINT").ok())?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat.interval_secs == 0 {
            return Err(ConfigError::Message(
                "heartbeat.interval_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(endpoint) = &self.notifier.endpoint {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::Message(
                    "notifier.endpoint must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl HeartbeatConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_missed_probes: default_max_missed_probes(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}
