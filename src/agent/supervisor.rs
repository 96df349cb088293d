//! Process-level lifecycle of the telemetry agent
//!
//! The supervisor connects the transport, subscribes to the control topic,
//! runs the cadence loop until a `stop` command and always tears the session
//! down afterwards.

use super::runner::{RunSummary, TelemetryAgent};
use crate::error::{AgentError, AgentResult};
use crate::lifecycle_span;
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Instrument};

/// Buffered transport events between the delivery task and the cadence loop
pub const EVENT_CHANNEL_CAPACITY: usize = 32;

pub struct Supervisor<T: Transport + 'static> {
    transport: Arc<T>,
    agent: TelemetryAgent<T>,
}

impl<T: Transport + 'static> Supervisor<T> {
    /// `agent` must publish through the same `transport`
    pub fn new(transport: Arc<T>, agent: TelemetryAgent<T>) -> Self {
        Self { transport, agent }
    }

    /// Run the agent to completion.
    ///
    /// Returns the run summary after a stop-driven shutdown. Connect and
    /// subscribe failures are fatal; the session is released on every path
    /// once a connection was attempted.
    pub async fn run(self) -> AgentResult<RunSummary> {
        let span = lifecycle_span!(agent_id = %self.agent.agent_id());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> AgentResult<RunSummary> {
        let Supervisor { transport, agent } = self;
        let control_topic = agent.control_topic().to_string();

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        transport.set_event_sender(event_tx).await;

        info!("Connecting to broker");
        if let Err(e) = transport.connect().await {
            error!("Failed to connect to broker: {}", e);
            Self::release(&transport).await;
            return Err(AgentError::connection_failed(e.to_string()));
        }

        if let Err(e) = transport.subscribe(&control_topic).await {
            error!(topic = %control_topic, "Failed to subscribe to control topic: {}", e);
            Self::release(&transport).await;
            return Err(AgentError::subscription_failed(e.to_string()));
        }
        info!(topic = %control_topic, "Listening for control commands");

        let outcome = tokio::spawn(agent.run(event_rx)).await;

        Self::release(&transport).await;

        match outcome {
            Ok(summary) => {
                info!(
                    ticks = summary.ticks,
                    published = summary.published,
                    publish_failures = summary.publish_failures,
                    final_state = %summary.final_state,
                    "Agent stopped"
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Cadence loop terminated abnormally: {}", e);
                Err(AgentError::internal_error(format!(
                    "Cadence loop terminated abnormally: {e}"
                )))
            }
        }
    }

    async fn release(transport: &Arc<T>) {
        if let Err(e) = transport.disconnect().await {
            warn!("Error during disconnect: {}", e);
        } else {
            info!("Disconnected from broker");
        }
    }
}
