//! Pure message routing for MQTT events
//!
//! This module turns raw rumqttc events into routing decisions and forwards
//! transport events to whoever registered interest.

use crate::transport::TransportEvent;
use rumqttc::v5::mqttbytes::v5::{Packet, SubscribeReasonCode};
use rumqttc::v5::Event;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Pure message routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(connack) => EventRoute::ConnectionAcknowledged {
                    session_present: connack.session_present,
                },
                Packet::Publish(publish) => EventRoute::MessageReceived {
                    topic: String::from_utf8_lossy(&publish.topic).to_string(),
                    payload: publish.payload.clone(),
                },
                Packet::Disconnect(disconnect) => EventRoute::Disconnected {
                    reason: format!("{:?}", disconnect.reason_code),
                },
                Packet::SubAck(suback) => EventRoute::SubscriptionConfirmed {
                    packet_id: suback.pkid,
                    failures: Self::subscription_failures(&suback.return_codes),
                },
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// Collect the reason codes of rejected subscriptions (pure function)
    pub fn subscription_failures(return_codes: &[SubscribeReasonCode]) -> Vec<String> {
        return_codes
            .iter()
            .filter(|code| !matches!(code, SubscribeReasonCode::Success(_)))
            .map(|code| format!("{code:?}"))
            .collect()
    }

    /// Render a JSON payload as `key -> value` lines for diagnostics.
    ///
    /// Non-object payloads are rendered lossily as text.
    pub fn describe_payload(payload: &[u8]) -> String {
        match serde_json::from_slice::<serde_json::Value>(payload) {
            Ok(serde_json::Value::Object(fields)) => fields
                .iter()
                .map(|(key, value)| format!("{key} -> {value}"))
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::from_utf8_lossy(payload).to_string(),
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone)]
pub enum EventRoute {
    /// Connection acknowledged - ready to publish/subscribe
    ConnectionAcknowledged { session_present: bool },
    /// Message received on subscribed topic
    MessageReceived { topic: String, payload: bytes::Bytes },
    /// MQTT broker disconnected
    Disconnected { reason: String },
    /// Subscription acknowledged; `failures` lists rejected filters
    SubscriptionConfirmed { packet_id: u16, failures: Vec<String> },
    /// Infrastructure event (PingResp, PubAck, etc.)
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}

/// Forwards transport events to the registered receiver (impure I/O)
#[derive(Debug, Default)]
pub struct EventForwarder {
    sender: Option<mpsc::Sender<TransportEvent>>,
}

impl EventForwarder {
    pub fn new() -> Self {
        Self { sender: None }
    }

    pub fn set_sender(&mut self, sender: mpsc::Sender<TransportEvent>) {
        self.sender = Some(sender);
    }

    /// Drop the sender so the receiving side observes end-of-stream
    pub fn clear(&mut self) {
        self.sender = None;
    }

    /// Forward an event; returns false if it was dropped
    pub async fn forward(&self, event: TransportEvent) -> bool {
        match &self.sender {
            Some(sender) => match sender.send(event).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Event receiver closed, dropping transport event: {:?}", e.0);
                    false
                }
            },
            None => {
                debug!("No event sender configured - transport event dropped");
                false
            }
        }
    }
}
