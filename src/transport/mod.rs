//! Transport layer for the telemetry agent
//!
//! This module provides the transport abstraction the agent publishes through
//! and receives control traffic from, plus the MQTT implementation.

use bytes::Bytes;
use tokio::sync::mpsc;

pub mod mqtt;

pub use mqtt::ConnectionState;

/// Events pushed from the transport's background delivery context
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The broker acknowledged a connection (initial or after a reconnect)
    Connected { session_present: bool },
    /// A frame arrived on a subscribed topic
    Message { topic: String, payload: Bytes },
    /// The session was lost; the transport may reconnect on its own
    Disconnected { reason: String },
}

/// Transport trait for the agent's broker session
///
/// This trait provides an abstraction over the transport mechanism
/// (MQTT in production) to enable dependency injection and testing.
/// All methods take `&self` so a single session can be shared between the
/// supervisor and the cadence loop.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Establish the session and start the background delivery loop.
    ///
    /// Returns only after the broker has acknowledged the connection.
    async fn connect(&self) -> Result<(), Self::Error>;

    /// Register interest in a topic; matching frames are pushed as events
    async fn subscribe(&self, topic: &str) -> Result<(), Self::Error>;

    /// Hand a frame to the session with at-least-once delivery
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error>;

    /// Stop the delivery loop, then tear down the session.
    ///
    /// No event is delivered after this returns.
    async fn disconnect(&self) -> Result<(), Self::Error>;

    /// Check if transport is currently connected
    fn is_connected(&self) -> bool {
        matches!(self.connection_state(), ConnectionState::Connected)
    }

    /// Get current connection state
    fn connection_state(&self) -> ConnectionState;

    /// Set the channel inbound events are forwarded to
    async fn set_event_sender(&self, sender: mpsc::Sender<TransportEvent>);
}

/// Type alias for MQTT transport
pub type MqttTransport = mqtt::MqttClient;
