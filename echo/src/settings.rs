use config::{Config, ConfigError, Environment, File};
use log::LevelFilter;
use serde::Deserialize;
use tcp_pool_net::{data_types::PortNumber, EndpointConfig};

pub const DEFAULT_PORT: PortNumber = 7878;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EchoSettings {
    /// Host the client connects to
    pub address: String,
    pub port: PortNumber,

    /// Text the client sends
    pub message: String,

    /// Overrides the build's default log level, e.g. "warn" or "trace"
    pub log_level: Option<String>,

    pub endpoint: EndpointConfig,
}

impl Default for EchoSettings {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1"),
            port: DEFAULT_PORT,
            message: String::from("PING"),
            log_level: None,
            endpoint: EndpointConfig::default(),
        }
    }
}

impl EchoSettings {
    /// Merges configuration sources for this environment
    pub fn load(environment: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(File::with_name(&format!("Settings.{environment}")).required(false))
            .add_source(
                Environment::with_prefix("ECHO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<EchoSettings>()
    }

    pub fn log_level(self: &Self) -> Option<LevelFilter> {
        self.log_level
            .as_ref()
            .and_then(|level| level.parse::<LevelFilter>().ok())
    }
}
