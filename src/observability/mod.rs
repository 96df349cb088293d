//! Observability for the telemetry agent
//!
//! Structured logging through `tracing`, with span macros for the agent
//! lifecycle and the MQTT session.

pub mod logging;

pub use logging::{init_default_logging, init_logging, level_for_verbosity, parse_level, LogFormat};

// Span macros for structured logging
pub use logging::{lifecycle_span, mqtt_span};
