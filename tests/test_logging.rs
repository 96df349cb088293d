//! Tests for logging configuration and format parsing

use telemetry_agent::observability::{level_for_verbosity, parse_level, LogFormat};
use tracing::Level;

#[test]
fn test_log_format_parse() {
    assert_eq!(LogFormat::parse("json"), LogFormat::Json);
    assert_eq!(LogFormat::parse("Pretty"), LogFormat::Pretty);
    assert_eq!(LogFormat::parse("COMPACT"), LogFormat::Compact);
}

#[test]
fn test_log_format_parse_invalid_defaults_to_json() {
    assert_eq!(LogFormat::parse("yaml"), LogFormat::Json);
    assert_eq!(LogFormat::parse("123"), LogFormat::Json);
}

#[test]
fn test_log_level_defaults_to_info() {
    assert_eq!(parse_level(""), Level::INFO);
    assert_eq!(parse_level("verbose"), Level::INFO);
}

#[test]
fn test_cli_verbosity_on_top_of_env_level() {
    let base = parse_level("WARN");
    assert_eq!(level_for_verbosity(base, 0), Level::WARN);
    assert_eq!(level_for_verbosity(base, 1), Level::DEBUG);
    assert_eq!(level_for_verbosity(base, 2), Level::TRACE);
}

#[test]
fn test_span_macros_create_spans() {
    let _lifecycle = telemetry_agent::lifecycle_span!(agent_id = "thing-01");
    let _mqtt = telemetry_agent::mqtt_span!(client_id = "thing-01-abc");
}
