//! MQTT client implementation for the telemetry agent
//!
//! This module separates pure functions from I/O operations for better
//! testability.
//!
//! # Architecture
//!
//! - [`connection`] - Pure connection state, TLS option building, and errors
//! - [`message_handler`] - Pure event routing plus the event forwarder
//! - [`client`] - Impure I/O operations and coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use telemetry_agent::config::AgentConfig;
//! use telemetry_agent::transport::{mqtt::MqttClient, Transport};
//! use std::path::Path;
//!
//! # tokio_test::block_on(async {
//! let config = AgentConfig::load_from_file(Path::new("telemetry-agent.toml"))?;
//! let client = MqttClient::new(&config)?;
//! client.connect().await?;
//! client.subscribe("control/commands").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod message_handler;

// Re-export public types for convenience
pub use client::MqttClient;
pub use connection::{ConnectionEvent, ConnectionState, MqttError};
pub use message_handler::{EventForwarder, EventRoute, MessageHandler};
