//! Configuration loading and validation tests
//!
//! Tests focus on behavior of configuration loading, validation, and error handling.


use std::path::Path;
use std::time::Duration;
use telemetry_agent::config::{AgentConfig, ConfigError};
use test_helpers::{write_config, MINIMAL_CONFIG};

#[test]
fn test_config_loads_with_defaults() {
    let file = write_config(MINIMAL_CONFIG);

    let config = AgentConfig::load_from_file(file.path()).unwrap();

    assert_eq!(config.agent.id, "thing-01");
    assert_eq!(config.publish_interval(), Duration::from_secs(3));
    assert_eq!(config.mqtt.host, "broker.example.com");
    assert_eq!(config.mqtt.port, 8883);
    assert_eq!(config.keepalive(), Duration::from_secs(60));
    assert_eq!(config.mqtt.telemetry_topic, "sensor/data");
    assert_eq!(config.mqtt.control_topic, "control/commands");
    assert_eq!(config.sensor.seed, None);
}

#[test]
fn test_config_loads_all_fields() {
    let file = write_config(
        r#"
[agent]
id = "thing-02"
publish_interval_secs = 1

[mqtt]
host = "example-ats.iot.us-east-1.amazonaws.com"
port = 443
keepalive_secs = 30
client_id = "thing-02"
telemetry_topic = "devices/thing-02/data"
control_topic = "devices/thing-02/control"

[tls]
ca_cert = "/certs/ca.pem"
client_cert = "/certs/device.pem.crt"
client_key = "/certs/private.pem.key"

[sensor]
seed = 42
"#,
    );

    let config = AgentConfig::load_from_file(file.path()).unwrap();

    assert_eq!(config.publish_interval(), Duration::from_secs(1));
    assert_eq!(config.mqtt.port, 443);
    assert_eq!(config.keepalive(), Duration::from_secs(30));
    assert_eq!(config.client_id(), "thing-02");
    assert_eq!(config.mqtt.control_topic, "devices/thing-02/control");
    assert_eq!(config.sensor.seed, Some(42));
}

#[test]
fn test_generated_client_id_is_prefixed_and_unique() {
    let file = write_config(MINIMAL_CONFIG);
    let config = AgentConfig::load_from_file(file.path()).unwrap();

    let first = config.client_id();
    let second = config.client_id();

    assert!(first.starts_with("thing-01-"));
    assert_ne!(first, second);
}

#[test]
fn test_relative_tls_paths_resolve_against_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("telemetry-agent.toml");
    std::fs::write(
        &path,
        r#"
[agent]
id = "thing-01"

[mqtt]
host = "broker.example.com"

[tls]
ca_cert = "certs/ca.pem"
client_cert = "certs/device.pem.crt"
client_key = "/abs/private.pem.key"
"#,
    )
    .unwrap();

    let config = AgentConfig::load_from_file(&path).unwrap();

    assert_eq!(config.tls.ca_cert, dir.path().join("certs/ca.pem"));
    assert_eq!(config.tls.client_cert, dir.path().join("certs/device.pem.crt"));
    assert_eq!(config.tls.client_key, Path::new("/abs/private.pem.key"));
}

#[test]
fn test_missing_file_is_reported() {
    let result = AgentConfig::load_from_file(Path::new("/nonexistent/telemetry-agent.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml_is_reported() {
    let file = write_config("[agent\nid = ");
    let result = AgentConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_missing_tls_section_is_rejected() {
    let file = write_config(
        r#"
[agent]
id = "thing-01"

[mqtt]
host = "broker.example.com"
"#,
    );
    let result = AgentConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_invalid_agent_id_is_rejected() {
    let file = write_config(&MINIMAL_CONFIG.replace("thing-01", "thing 01"));
    let result = AgentConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidAgentId(_))));
}

#[test]
fn test_out_of_range_values_are_rejected() {
    let cases = [
        ("id = \"thing-01\"", "id = \"thing-01\"\npublish_interval_secs = 0"),
        ("host = \"broker.example.com\"", "host = \"broker.example.com\"\nkeepalive_secs = 2"),
        ("host = \"broker.example.com\"", "host = \"broker.example.com\"\nport = 0"),
        ("host = \"broker.example.com\"", "host = \"  \""),
        (
            "host = \"broker.example.com\"",
            "host = \"broker.example.com\"\ncontrol_topic = \"control/#\"",
        ),
        (
            "host = \"broker.example.com\"",
            "host = \"broker.example.com\"\ncontrol_topic = \"sensor/data\"",
        ),
    ];

    for (from, to) in cases {
        let file = write_config(&MINIMAL_CONFIG.replace(from, to));
        let result = AgentConfig::load_from_file(file.path());
        assert!(
            matches!(result, Err(ConfigError::InvalidConfig(_))),
            "expected InvalidConfig for {to:?}, got {result:?}"
        );
    }
}

#[test]
fn test_overrides_replace_broker_and_tls_settings() {
    let file = write_config(MINIMAL_CONFIG);
    let mut config = AgentConfig::load_from_file(file.path()).unwrap();

    config
        .apply_overrides(|key| match key {
            "TELEMETRY_BROKER_HOST" => Some("localhost".to_string()),
            "TELEMETRY_BROKER_PORT" => Some("18883".to_string()),
            "TELEMETRY_CLIENT_KEY" => Some("/run/secrets/key.pem".to_string()),
            _ => None,
        })
        .unwrap();

    assert_eq!(config.mqtt.host, "localhost");
    assert_eq!(config.mqtt.port, 18883);
    assert_eq!(config.tls.client_key, Path::new("/run/secrets/key.pem"));
    assert_eq!(config.tls.ca_cert, Path::new("/etc/telemetry/AmazonRootCA1.pem"));
}

#[test]
fn test_invalid_port_override_is_rejected() {
    let file = write_config(MINIMAL_CONFIG);
    let mut config = AgentConfig::load_from_file(file.path()).unwrap();

    let result = config.apply_overrides(|key| {
        (key == "TELEMETRY_BROKER_PORT").then(|| "not-a-port".to_string())
    });

    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_config_round_trips_through_toml() {
    let file = write_config(MINIMAL_CONFIG);
    let config = AgentConfig::load_from_file(file.path()).unwrap();

    let rendered = toml::to_string_pretty(&config).unwrap();
    let reparsed: AgentConfig = toml::from_str(&rendered).unwrap();

    assert_eq!(reparsed, config);
}
