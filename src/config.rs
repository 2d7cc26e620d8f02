//! Agent configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via GLONAX_CONFIG or --config)
//! 3. Environment variables

use glonax_client::{ConnectionConfig, HandlerPolicy, DEFAULT_USER_AGENT};
use glonax_protocol::{DEFAULT_PORT, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control unit connection.
    pub glonax: GlonaxConfig,
    /// Client identity and dispatch behavior.
    pub client: ClientConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("GLONAX_CONFIG").ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        self.glonax.apply_overrides(&var);
        self.client.apply_overrides(&var);
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.glonax.address.is_empty() {
            return Err(ConfigError::ValidationError(
                "glonax.address must not be empty".to_string(),
            ));
        }
        if self.glonax.protocol_version == 0 {
            return Err(ConfigError::ValidationError(
                "glonax.protocol_version must be non-zero".to_string(),
            ));
        }
        // The session payload carries one version byte in front of the agent
        if self.client.user_agent.len() >= MAX_PAYLOAD_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "client.user_agent too long: {} bytes",
                self.client.user_agent.len()
            )));
        }
        Ok(())
    }

    /// Builds the client connection configuration.
    pub fn connection_config(&self) -> ConnectionConfig {
        let mut config = ConnectionConfig::new(self.glonax.endpoint())
            .with_connect_timeout(Duration::from_secs(self.glonax.connect_timeout_secs))
            .with_protocol_version(self.glonax.protocol_version)
            .with_user_agent(self.client.user_agent.clone())
            .with_handler_policy(self.client.handler_policy);
        if let Some(timeout) = self.glonax.read_timeout() {
            config = config.with_read_timeout(timeout);
        }
        config
    }
}

/// Control unit connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlonaxConfig {
    /// Host name, IP address, or `unix:/path` socket.
    pub address: String,
    /// TCP port, ignored for Unix sockets.
    pub port: u16,
    /// Wire protocol version.
    pub protocol_version: u8,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Frame read timeout in seconds (0 = wait forever).
    pub read_timeout_secs: u64,
}

impl Default for GlonaxConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
            port: DEFAULT_PORT,
            protocol_version: PROTOCOL_VERSION,
            connect_timeout_secs: 10,
            read_timeout_secs: 0,
        }
    }
}

impl GlonaxConfig {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(address) = var("GLONAX_ADDRESS") {
            self.address = address;
        }

        if let Some(port) = var("GLONAX_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid GLONAX_PORT '{}'", port),
            }
        }

        if let Some(version) = var("GLONAX_PROTOCOL_VERSION") {
            match parse_version(&version) {
                Some(version) => self.protocol_version = version,
                None => tracing::warn!("Ignoring invalid GLONAX_PROTOCOL_VERSION '{}'", version),
            }
        }

        if let Some(timeout) = var("GLONAX_READ_TIMEOUT") {
            match timeout.parse() {
                Ok(secs) => self.read_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring invalid GLONAX_READ_TIMEOUT '{}'", timeout),
            }
        }
    }

    /// Returns the address handed to the client.
    pub fn endpoint(&self) -> String {
        if self.address.starts_with("unix:") {
            self.address.clone()
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    /// Returns the read timeout, if any.
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}

/// Parses a version byte, decimal or `0x` hex.
fn parse_version(value: &str) -> Option<u8> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Client identity and dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User agent sent in the session announcement.
    pub user_agent: String,
    /// Whether a failing telemetry handler stops the agent.
    pub handler_policy: HandlerPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            handler_policy: HandlerPolicy::Skip,
        }
    }
}

impl ClientConfig {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(user_agent) = var("GLONAX_USER_AGENT") {
            self.user_agent = user_agent;
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.glonax.endpoint(), "localhost:30051");
        assert_eq!(config.glonax.protocol_version, 0x03);
        assert_eq!(config.glonax.read_timeout(), None);
        assert_eq!(config.client.handler_policy, HandlerPolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "glonax:\n  address: 10.0.0.7\n  port: 30052\n  read_timeout_secs: 5\nclient:\n  user_agent: pyglonax/0.2\n  handler_policy: stop"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.glonax.endpoint(), "10.0.0.7:30052");
        assert_eq!(config.glonax.read_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.client.user_agent, "pyglonax/0.2");
        assert_eq!(config.client.handler_policy, HandlerPolicy::Stop);
        // Unset fields keep their defaults
        assert_eq!(config.glonax.protocol_version, PROTOCOL_VERSION);

        let conn = config.connection_config();
        assert_eq!(conn.address, "10.0.0.7:30052");
        assert_eq!(conn.user_agent, "pyglonax/0.2");
        assert_eq!(conn.read_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/glonax.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(_, _))));
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "glonax:\n  port: not-a-number").unwrap();
        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_, _))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GLONAX_ADDRESS", "unix:/run/glonax.sock"),
            ("GLONAX_PORT", "1"),
            ("GLONAX_PROTOCOL_VERSION", "0x02"),
            ("GLONAX_USER_AGENT", "agent/9"),
            ("GLONAX_READ_TIMEOUT", "garbage"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.glonax.endpoint(), "unix:/run/glonax.sock");
        assert_eq!(config.glonax.protocol_version, 0x02);
        assert_eq!(config.client.user_agent, "agent/9");
        // Unparsable values are ignored
        assert_eq!(config.glonax.read_timeout_secs, 0);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("0x03"), Some(0x03));
        assert_eq!(parse_version("0X0a"), Some(0x0A));
        assert_eq!(parse_version("2"), Some(0x02));
        assert_eq!(parse_version("0x"), None);
        assert_eq!(parse_version("0x100"), None);
        assert_eq!(parse_version("three"), None);

        let mut config = Config::default();
        config.apply_overrides(|key| {
            (key == "GLONAX_PROTOCOL_VERSION").then(|| "v3".to_string())
        });
        assert_eq!(config.glonax.protocol_version, PROTOCOL_VERSION);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.client.user_agent = "x".repeat(MAX_PAYLOAD_SIZE);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = Config::default();
        config.glonax.protocol_version = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.glonax.endpoint(), config.glonax.endpoint());
        assert_eq!(parsed.client.handler_policy, config.client.handler_policy);
    }
}
