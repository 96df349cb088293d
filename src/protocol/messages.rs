//! Message types carried over the telemetry and control topics
//!
//! Telemetry payloads are flat JSON objects with the keys `humidity`,
//! `temperature` and `datetime`. Control payloads are flat JSON objects with a
//! single meaningful key, `command`.

use crate::sensor::SensorSample;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar/time pattern used for the `datetime` field (local time)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single timestamped sensor reading
///
/// Produced once per publishing tick and consumed immediately by the encoder.
/// Downstream consumers deserialize the same structure from the payload.
///
/// # Examples
/// ```
/// use telemetry_agent::protocol::SensorReading;
///
/// let reading = SensorReading {
///     humidity: 55.2,
///     temperature: 21.7,
///     datetime: "2024-01-01 12:00:00".to_string(),
/// };
/// assert_eq!(reading.datetime, "2024-01-01 12:00:00");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    /// Relative humidity in percent
    pub humidity: f64,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Local wall-clock time formatted with [`TIMESTAMP_FORMAT`]
    pub datetime: String,
}

impl SensorReading {
    /// Stamp a raw sensor sample with a wall-clock time
    pub fn new(sample: SensorSample, timestamp: NaiveDateTime) -> Self {
        Self {
            humidity: sample.humidity,
            temperature: sample.temperature,
            datetime: timestamp.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// An encoded reading addressed to the telemetry topic
///
/// Always published with at-least-once delivery and never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Operator command received on the control topic
///
/// The set of known commands is closed; anything else is carried verbatim in
/// [`Command::Unknown`] so it can be logged and then ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop,
    Pause,
    Resume,
    Unknown(String),
}

impl Command {
    /// Map a raw `command` value onto the closed command set (exact match)
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => Command::Stop,
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            other => Command::Unknown(other.to_string()),
        }
    }

    /// Wire representation of the command
    pub fn as_str(&self) -> &str {
        match self {
            Command::Stop => "stop",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
