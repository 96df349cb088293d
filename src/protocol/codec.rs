//! Payload encoding for telemetry and decoding for control frames
//!
//! Both directions use self-describing JSON so that downstream consumers and
//! operator tooling need no schema coordination with the agent.

use super::messages::{Command, SensorReading, TelemetryMessage};
use serde_json::Value;
use thiserror::Error;

/// Reasons a control frame is rejected before reaching the state machine
#[derive(Debug, Error)]
pub enum ControlDecodeError {
    #[error("Control frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Control frame is not a JSON object")]
    NotAnObject,
    #[error("Control frame has no \"command\" field")]
    MissingCommand,
}

/// Serializes readings into telemetry payloads
pub struct TelemetryEncoder;

impl TelemetryEncoder {
    /// Encode a reading as a flat JSON object (pure, deterministic)
    pub fn encode(reading: &SensorReading) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(reading)
    }

    /// Encode a reading and address it to `topic`
    pub fn encode_message(
        topic: &str,
        reading: &SensorReading,
    ) -> Result<TelemetryMessage, serde_json::Error> {
        Ok(TelemetryMessage {
            topic: topic.to_string(),
            payload: Self::encode(reading)?,
        })
    }

    /// Decode a telemetry payload the way a downstream consumer would
    pub fn decode(payload: &[u8]) -> Result<SensorReading, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// Parses inbound control frames into typed commands
pub struct ControlDecoder;

impl ControlDecoder {
    /// Decode a control frame.
    ///
    /// String `command` values map onto [`Command`]; non-string values are
    /// accepted syntactically and surface as [`Command::Unknown`] with their JSON
    /// text. Structural problems are reported as [`ControlDecodeError`].
    pub fn decode(payload: &[u8]) -> Result<Command, ControlDecodeError> {
        let frame: Value =
            serde_json::from_slice(payload).map_err(ControlDecodeError::InvalidJson)?;

        let fields = frame.as_object().ok_or(ControlDecodeError::NotAnObject)?;
        let command = fields
            .get("command")
            .ok_or(ControlDecodeError::MissingCommand)?;

        Ok(match command {
            Value::String(raw) => Command::parse(raw),
            other => Command::Unknown(other.to_string()),
        })
    }

    /// Encode a command frame (used by operator tooling)
    pub fn encode(command: &Command) -> Vec<u8> {
        serde_json::json!({ "command": command.as_str() })
            .to_string()
            .into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reading() -> SensorReading {
        SensorReading {
            humidity: 55.2,
            temperature: 21.7,
            datetime: "2024-01-01 12:00:00".to_string(),
        }
    }

    #[test]
    fn test_encode_message_addresses_reading() {
        let message =
            TelemetryEncoder::encode_message("sensor/data", &sample_reading()).unwrap();

        assert_eq!(message.topic, "sensor/data");
        assert_eq!(
            TelemetryEncoder::decode(&message.payload).unwrap(),
            sample_reading()
        );
    }

    #[test]
    fn test_encode_has_exactly_three_named_keys() {
        let payload = TelemetryEncoder::encode(&sample_reading()).unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 3);
        assert_eq!(object["humidity"], serde_json::json!(55.2));
        assert_eq!(object["temperature"], serde_json::json!(21.7));
        assert_eq!(object["datetime"], "2024-01-01 12:00:00");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let first = TelemetryEncoder::encode(&sample_reading()).unwrap();
        let second = TelemetryEncoder::encode(&sample_reading()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_downstream_decode_preserves_values() {
        let payload = TelemetryEncoder::encode(&sample_reading()).unwrap();
        let decoded = TelemetryEncoder::decode(&payload).unwrap();

        assert_eq!(decoded, sample_reading());
    }

    #[test]
    fn test_decode_known_commands() {
        assert_eq!(
            ControlDecoder::decode(br#"{"command": "stop"}"#).unwrap(),
            Command::Stop
        );
        assert_eq!(
            ControlDecoder::decode(br#"{"command": "pause"}"#).unwrap(),
            Command::Pause
        );
        assert_eq!(
            ControlDecoder::decode(br#"{"command": "resume"}"#).unwrap(),
            Command::Resume
        );
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let command =
            ControlDecoder::decode(br#"{"command": "pause", "issued_by": "ops"}"#).unwrap();
        assert_eq!(command, Command::Pause);
    }

    #[test]
    fn test_decode_unknown_command() {
        let command = ControlDecoder::decode(br#"{"command": "reboot"}"#).unwrap();
        assert_eq!(command, Command::Unknown("reboot".to_string()));
    }

    #[test]
    fn test_decode_non_string_command_is_unknown() {
        let command = ControlDecoder::decode(br#"{"command": 5}"#).unwrap();
        assert_eq!(command, Command::Unknown("5".to_string()));

        let command = ControlDecoder::decode(br#"{"command": null}"#).unwrap();
        assert_eq!(command, Command::Unknown("null".to_string()));
    }

    #[test]
    fn test_decode_missing_command() {
        let result = ControlDecoder::decode(br#"{"cmd": "stop"}"#);
        assert!(matches!(result, Err(ControlDecodeError::MissingCommand)));
    }

    #[test]
    fn test_decode_invalid_json() {
        let result = ControlDecoder::decode(b"stop");
        assert!(matches!(result, Err(ControlDecodeError::InvalidJson(_))));

        let result = ControlDecoder::decode(&[0xff, 0xfe, 0x00]);
        assert!(matches!(result, Err(ControlDecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        let result = ControlDecoder::decode(br#"["stop"]"#);
        assert!(matches!(result, Err(ControlDecodeError::NotAnObject)));

        let result = ControlDecoder::decode(br#""stop""#);
        assert!(matches!(result, Err(ControlDecodeError::NotAnObject)));
    }

    #[test]
    fn test_command_frame_encoding_decodes_back() {
        for command in [Command::Stop, Command::Pause, Command::Resume] {
            let frame = ControlDecoder::encode(&command);
            assert_eq!(ControlDecoder::decode(&frame).unwrap(), command);
        }
    }
}
