//! Telemetry Agent
//!
//! A command-driven MQTT telemetry agent: it samples a sensor on a fixed
//! cadence, publishes each reading over mutually authenticated TLS, and
//! listens on a control topic for `pause`, `resume` and `stop` commands.
//!
//! # Overview
//!
//! - Sensor sources and the pseudo-random sensor ([`sensor`])
//! - Telemetry and control payloads with their codecs ([`protocol`])
//! - The MQTT transport and its delivery task ([`transport`])
//! - The enumerated run state, cadence loop and supervisor ([`agent`])
//!
//! # Quick Start
//!
//! ```rust
//! use telemetry_agent::protocol::{Command, ControlDecoder, SensorReading, TelemetryEncoder};
//!
//! let reading = SensorReading {
//!     humidity: 55.2,
//!     temperature: 21.7,
//!     datetime: "2024-01-01 12:00:00".to_string(),
//! };
//! let payload = TelemetryEncoder::encode(&reading).unwrap();
//! assert_eq!(TelemetryEncoder::decode(&payload).unwrap(), reading);
//!
//! let command = ControlDecoder::decode(br#"{"command": "pause"}"#).unwrap();
//! assert_eq!(command, Command::Pause);
//! ```

pub mod agent;
pub mod clock;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod sensor;
pub mod testing;
pub mod transport;

pub use agent::{AgentState, RunMode, RunSummary, Supervisor, TelemetryAgent};
pub use config::{AgentConfig, ConfigError};
pub use error::{AgentError, AgentResult};
pub use protocol::*;
pub use transport::mqtt::MqttClient;
