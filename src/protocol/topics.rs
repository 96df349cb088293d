//! Topic names and identifier validation for the telemetry agent
//!
//! The agent publishes readings on a single telemetry topic and listens for
//! operator commands on a single control topic. Both may be overridden in the
//! configuration file, so the validation rules here are applied at load time.

use thiserror::Error;

/// Topic on which sensor readings are published
pub const SENSOR_DATA_TOPIC: &str = "sensor/data";

/// Topic on which control commands are received
pub const CONTROL_TOPIC: &str = "control/commands";

/// Validate a topic name used for publishing or exact-match subscription.
///
/// Wildcards are rejected: the agent subscribes to exactly one control topic and
/// publishes to exactly one telemetry topic.
pub fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.is_empty() {
        return Err(ValidationError::EmptyTopic);
    }

    for ch in topic.chars() {
        match ch {
            '+' | '#' => return Err(ValidationError::WildcardInTopic(ch)),
            '\0' => return Err(ValidationError::NulInTopic),
            _ => {}
        }
    }

    Ok(())
}

pub fn validate_agent_id(agent_id: &str) -> Result<(), ValidationError> {
    if agent_id.is_empty() {
        return Err(ValidationError::EmptyAgentId);
    }

    for ch in agent_id.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '.' && ch != '_' && ch != '-' {
            return Err(ValidationError::InvalidAgentIdChar(ch));
        }
    }

    Ok(())
}

/// Validation errors for topics and identifiers
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Agent ID cannot be empty")]
    EmptyAgentId,
    #[error("Agent ID contains invalid character: '{0}'")]
    InvalidAgentIdChar(char),
    #[error("Topic cannot be empty")]
    EmptyTopic,
    #[error("Topic contains wildcard character: '{0}'")]
    WildcardInTopic(char),
    #[error("Topic contains a NUL character")]
    NulInTopic,
}
