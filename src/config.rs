//! Configuration system for the telemetry agent
//!
//! Configuration is read once at startup from a TOML file. Broker coordinates
//! and TLS material paths may be overridden from the environment, which is how
//! deployments usually inject per-device values.

use crate::protocol::{validate_agent_id, validate_topic, CONTROL_TOPIC, SENSOR_DATA_TOPIC};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding `mqtt.host`
pub const ENV_BROKER_HOST: &str = "TELEMETRY_BROKER_HOST";
/// Environment variable overriding `mqtt.port`
pub const ENV_BROKER_PORT: &str = "TELEMETRY_BROKER_PORT";
/// Environment variable overriding `tls.ca_cert`
pub const ENV_CA_CERT: &str = "TELEMETRY_CA_CERT";
/// Environment variable overriding `tls.client_cert`
pub const ENV_CLIENT_CERT: &str = "TELEMETRY_CLIENT_CERT";
/// Environment variable overriding `tls.client_key`
pub const ENV_CLIENT_KEY: &str = "TELEMETRY_CLIENT_KEY";

/// Smallest keep-alive the MQTT client accepts
/// rumqttc rejects keep-alive intervals shorter than this
pub const MIN_KEEPALIVE_SECS: u64 = 5;
/// CONNECT carries keep-alive as a 16-bit field
pub const MAX_KEEPALIVE_SECS: u64 = u16::MAX as u64;

/// Main agent configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub agent: AgentSection,
    pub mqtt: MqttSection,
    pub tls: TlsSection,
    #[serde(default)]
    pub sensor: SensorSection,
}

/// Agent section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Agent identifier (must match [a-zA-Z0-9._-]+)
    pub id: String,
    /// Publish cadence in seconds (default: 3)
    #[serde(default = "default_publish_interval")]
    pub publish_interval_secs: u64,
}

/// MQTT broker section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker host name
    pub host: String,
    /// Broker port (default: 8883)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Keep-alive interval in seconds (default: 60)
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
    /// Client identifier presented to the broker; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default = "default_telemetry_topic")]
    pub telemetry_topic: String,
    #[serde(default = "default_control_topic")]
    pub control_topic: String,
}

/// Mutual TLS material
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TlsSection {
    /// CA bundle used to verify the broker
    pub ca_cert: PathBuf,
    /// Client certificate presented to the broker
    pub client_cert: PathBuf,
    /// Private key for the client certificate
    pub client_key: PathBuf,
}

/// Pseudo sensor section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SensorSection {
    /// Seed for a reproducible reading sequence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_publish_interval() -> u64 {
    3
}

fn default_port() -> u16 {
    8883
}

fn default_keepalive() -> u64 {
    60
}

fn default_telemetry_topic() -> String {
    SENSOR_DATA_TOPIC.to_string()
}

fn default_control_topic() -> String {
    CONTROL_TOPIC.to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid agent ID format: {0}")]
    InvalidAgentId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AgentConfig {
    /// Load configuration from TOML file, apply environment overrides, and validate
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AgentConfig = toml::from_str(&content)?;

        config.apply_overrides(|key| std::env::var(key).ok())?;

        if let Some(base_dir) = path.parent() {
            config.resolve_relative_paths(base_dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_BROKER_HOST) {
            self.mqtt.host = host;
        }
        if let Some(port) = lookup(ENV_BROKER_PORT) {
            self.mqtt.port = port.trim().parse().map_err(|_| {
                ConfigError::InvalidConfig(format!("{ENV_BROKER_PORT} is not a valid port: {port}"))
            })?;
        }
        if let Some(path) = lookup(ENV_CA_CERT) {
            self.tls.ca_cert = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_CLIENT_CERT) {
            self.tls.client_cert = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_CLIENT_KEY) {
            self.tls.client_key = PathBuf::from(path);
        }
        Ok(())
    }

    /// Resolve relative TLS paths against the directory holding the config file
    pub fn resolve_relative_paths(&mut self, base_dir: &Path) {
        for path in [
            &mut self.tls.ca_cert,
            &mut self.tls.client_cert,
            &mut self.tls.client_key,
        ] {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }

    /// Check value ranges and identifiers
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_agent_id(&self.agent.id).map_err(|e| {
            ConfigError::InvalidAgentId(format!(
                "Agent ID '{}' must match pattern [a-zA-Z0-9._-]+ ({e})",
                self.agent.id
            ))
        })?;

        if self.agent.publish_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "agent.publish_interval_secs must be at least 1".to_string(),
            ));
        }

        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "mqtt.host must not be empty".to_string(),
            ));
        }

        if self.mqtt.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "mqtt.port must not be 0".to_string(),
            ));
        }

        if !(MIN_KEEPALIVE_SECS..=MAX_KEEPALIVE_SECS).contains(&self.mqtt.keepalive_secs) {
            return Err(ConfigError::InvalidConfig(format!(
                "mqtt.keepalive_secs must be between {MIN_KEEPALIVE_SECS} and {MAX_KEEPALIVE_SECS}"
            )));
        }

        if let Some(client_id) = &self.mqtt.client_id {
            if client_id.is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "mqtt.client_id must not be empty when set".to_string(),
                ));
            }
        }

        for (name, topic) in [
            ("mqtt.telemetry_topic", &self.mqtt.telemetry_topic),
            ("mqtt.control_topic", &self.mqtt.control_topic),
        ] {
            validate_topic(topic)
                .map_err(|e| ConfigError::InvalidConfig(format!("{name}: {e}")))?;
        }

        if self.mqtt.telemetry_topic == self.mqtt.control_topic {
            return Err(ConfigError::InvalidConfig(
                "telemetry and control topics must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Publish cadence
    pub fn publish_interval(&self) -> Duration {
        Duration::from_secs(self.agent.publish_interval_secs)
    }

    /// MQTT keep-alive interval
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.mqtt.keepalive_secs)
    }

    /// Client identifier to present to the broker
    pub fn client_id(&self) -> String {
        match &self.mqtt.client_id {
            Some(client_id) => client_id.clone(),
            None => format!("{}-{}", self.agent.id, uuid::Uuid::new_v4().simple()),
        }
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[agent]
id = "test-agent"
publish_interval_secs = 1

[mqtt]
host = "localhost"
port = 8883

[tls]
ca_cert = "/etc/telemetry/ca.pem"
client_cert = "/etc/telemetry/device.pem.crt"
client_key = "/etc/telemetry/private.pem.key"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
