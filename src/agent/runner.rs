//! Cadence loop of the telemetry agent
//!
//! [`TelemetryAgent::run`] is the only code that mutates [`AgentState`]. It
//! multiplexes transport events (ConnAck, control frames, connection loss)
//! with a fixed-period ticker; on each publishing tick it samples the sensor,
//! stamps and encodes the reading, and hands it to the transport.

use super::state::{AgentEvent, AgentState, RunMode, Transition};
use crate::clock::{Clock, LocalClock};
use crate::config::AgentConfig;
use crate::protocol::{
    Command, ControlDecoder, SensorReading, TelemetryEncoder, CONTROL_TOPIC, SENSOR_DATA_TOPIC,
};
use crate::sensor::{PseudoSensor, SensorSource};
use crate::transport::{Transport, TransportEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Cadence used when none is configured
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_secs(3);

/// Counters reported when the cadence loop exits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Cadence ticks observed, in any state
    pub ticks: u64,
    /// Readings accepted by the transport
    pub published: u64,
    /// Readings that could not be encoded or handed to the transport
    pub publish_failures: u64,
    pub final_state: AgentState,
}

/// Drives sampling and publishing according to the agent state
pub struct TelemetryAgent<T: Transport> {
    agent_id: String,
    transport: Arc<T>,
    sensor: Box<dyn SensorSource>,
    clock: Box<dyn Clock>,
    publish_interval: Duration,
    telemetry_topic: String,
    control_topic: String,
    state: AgentState,
    ticks: u64,
    published: u64,
    publish_failures: u64,
}

impl<T: Transport> TelemetryAgent<T> {
    pub fn new(
        agent_id: impl Into<String>,
        transport: Arc<T>,
        sensor: Box<dyn SensorSource>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            transport,
            sensor,
            clock,
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
            telemetry_topic: SENSOR_DATA_TOPIC.to_string(),
            control_topic: CONTROL_TOPIC.to_string(),
            state: AgentState::default(),
            ticks: 0,
            published: 0,
            publish_failures: 0,
        }
    }

    /// Build an agent with a [`PseudoSensor`] and the local clock
    pub fn from_config(config: &AgentConfig, transport: Arc<T>) -> Self {
        Self::new(
            config.agent.id.clone(),
            transport,
            Box::new(PseudoSensor::new(config.sensor.seed)),
            Box::new(LocalClock),
        )
        .with_publish_interval(config.publish_interval())
        .with_topics(&config.mqtt.telemetry_topic, &config.mqtt.control_topic)
    }

    /// Set the cadence. A zero period is rejected and the current one kept.
    pub fn with_publish_interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            warn!(
                "Ignoring zero publish interval, keeping {:?}",
                self.publish_interval
            );
        } else {
            self.publish_interval = interval;
        }
        self
    }

    pub fn with_topics(mut self, telemetry_topic: &str, control_topic: &str) -> Self {
        self.telemetry_topic = telemetry_topic.to_string();
        self.control_topic = control_topic.to_string();
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn control_topic(&self) -> &str {
        &self.control_topic
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            published: self.published,
            publish_failures: self.publish_failures,
            final_state: self.state,
        }
    }

    /// Run until the agent is stopped.
    ///
    /// The first tick fires one full period after the call. Pending events are
    /// always handled before a due tick, so a `stop` that arrives together
    /// with a tick suppresses that tick's publish.
    pub async fn run(mut self, mut events: mpsc::Receiver<TransportEvent>) -> RunSummary {
        let period = self.publish_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        info!(
            agent_id = %self.agent_id,
            interval_ms = period.as_millis() as u64,
            topic = %self.telemetry_topic,
            "Cadence loop started"
        );

        while self.state.is_running() {
            tokio::select! {
                biased;

                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_transport_event(event),
                    None => {
                        warn!("Transport event stream closed, no further commands will be received");
                        events_open = false;
                    }
                },

                _ = ticker.tick() => self.tick().await,
            }
        }

        info!("Stop command received, restart the agent to resume publishing");
        self.summary()
    }

    /// Translate a transport event into a state machine input and apply it
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        let agent_event = match event {
            TransportEvent::Connected { session_present } => {
                debug!(session_present, "Broker acknowledged connection");
                AgentEvent::ConnectionEstablished
            }
            TransportEvent::Disconnected { reason } => AgentEvent::ConnectionLost(reason),
            TransportEvent::Message { topic, payload } => {
                if topic != self.control_topic {
                    debug!(topic = %topic, "Ignoring message on non-control topic");
                    return;
                }
                match ControlDecoder::decode(&payload) {
                    Ok(command) => AgentEvent::Command(command),
                    Err(e) => AgentEvent::MalformedCommand(e.to_string()),
                }
            }
        };

        self.apply(agent_event);
    }

    /// Apply a state machine input, logging the outcome
    pub fn apply(&mut self, event: AgentEvent) {
        match &event {
            AgentEvent::Command(Command::Unknown(raw)) => {
                warn!(command = %raw, "Unknown command ignored");
            }
            AgentEvent::Command(command) => info!(command = %command, "Control command received"),
            AgentEvent::MalformedCommand(reason) => {
                warn!(reason = %reason, "Discarding malformed control frame");
            }
            AgentEvent::ConnectionLost(reason) => {
                warn!(reason = %reason, "Connection lost, publishes fail until the transport reconnects");
            }
            AgentEvent::ConnectionEstablished => {}
        }

        match self.state.apply(&event) {
            Transition::Changed { from, to } => {
                info!(from = %from, to = %to, "Agent state changed");
                self.state = to;
            }
            Transition::Unchanged(state) => {
                debug!(state = %state, event = ?event, "No state change");
            }
        }
    }

    /// One cadence period elapsed
    pub async fn tick(&mut self) {
        self.ticks += 1;
        match self.state {
            AgentState::Running(RunMode::Publishing) => self.publish_reading().await,
            AgentState::Running(RunMode::Paused) => info!("Publishing paused"),
            AgentState::Running(RunMode::AwaitingConnection) => {
                info!("Waiting for connection before publishing")
            }
            AgentState::Stopped => {}
        }
    }

    async fn publish_reading(&mut self) {
        let reading = SensorReading::new(self.sensor.sample(), self.clock.now());

        let message = match TelemetryEncoder::encode_message(&self.telemetry_topic, &reading) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to encode reading: {}", e);
                self.publish_failures += 1;
                return;
            }
        };

        match self.transport.publish(&message.topic, message.payload).await {
            Ok(()) => {
                self.published += 1;
                info!(
                    humidity = reading.humidity,
                    temperature = reading.temperature,
                    datetime = %reading.datetime,
                    "Sent reading"
                );
            }
            Err(e) => {
                self.publish_failures += 1;
                warn!(topic = %message.topic, "Failed to publish reading: {}", e);
            }
        }
    }
}
