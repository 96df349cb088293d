//! Impure I/O operations for MQTT client
//!
//! This module handles all impure I/O operations including network communication,
//! async coordination, and integration with the rumqttc client.

use super::connection::{
    configure_mqtt_options, log_state_transition, ConnectionEvent, ConnectionState, MqttError,
};
use super::message_handler::{EventForwarder, EventRoute, MessageHandler};
use crate::config::AgentConfig;
use crate::mqtt_span;
use crate::transport::{Transport, TransportEvent};
use async_trait::async_trait;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

/// Capacity of the request channel between `AsyncClient` and `EventLoop`
const REQUEST_CHANNEL_CAPACITY: usize = 10;
/// How long `connect()` waits for the broker's ConnAck
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause between event loop polls after a runtime network error
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Upper bound for flushing DISCONNECT and stopping the delivery task
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// MQTT transport client for the telemetry agent
pub struct MqttClient {
    client_id: String,
    client: AsyncClient,
    event_loop: Mutex<Option<EventLoop>>,
    event_loop_handle: Mutex<Option<JoinHandle<()>>>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    subscribed_topics: Arc<Mutex<Vec<String>>>, // Track subscriptions for re-subscription
    event_forwarder: Arc<Mutex<EventForwarder>>,
    connect_timeout: Duration,
    retry_delay: Duration,
}

/// Everything the background delivery task shares with the client.
///
/// The `EventLoop` is kept outside: it is not `Sync`, and this context is
/// borrowed across awaits.
struct DeliveryContext {
    client_id: String,
    client: AsyncClient,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_rx: watch::Receiver<bool>,
    subscribed_topics: Arc<Mutex<Vec<String>>>,
    event_forwarder: Arc<Mutex<EventForwarder>>,
    retry_delay: Duration,
}

impl MqttClient {
    /// Build the client from configuration. Reads TLS material; does not connect.
    pub fn new(config: &AgentConfig) -> Result<Self, MqttError> {
        let client_id = config.client_id();
        let mqtt_options = configure_mqtt_options(&client_id, config)?;

        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(MqttClient {
            client_id,
            client,
            event_loop: Mutex::new(Some(event_loop)),
            event_loop_handle: Mutex::new(None),
            state_tx,
            state_rx,
            shutdown_tx,
            subscribed_topics: Arc::new(Mutex::new(Vec::new())),
            event_forwarder: Arc::new(Mutex::new(EventForwarder::new())),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Override how long `connect()` waits for ConnAck
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Wait for connection confirmation (ConnAck) with timeout
    async fn wait_for_connection_confirmation(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let timeout_result = tokio::time::timeout(timeout, async {
            loop {
                match &*state_rx.borrow_and_update() {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Disconnected(reason) => {
                        return Err(MqttError::ConnectionFailed(reason.clone()));
                    }
                    ConnectionState::Idle | ConnectionState::Connecting => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::ConnectionFailed(
                        "State channel closed".to_string(),
                    ));
                }
            }
        })
        .await;

        match timeout_result {
            Ok(result) => result,
            Err(_) => Err(MqttError::ConnectionTimeout(timeout)),
        }
    }

    /// Move the shared connection state and log the transition
    fn transition(state_tx: &watch::Sender<ConnectionState>, event: ConnectionEvent) {
        state_tx.send_modify(|state| {
            let next = state.next(event);
            log_state_transition(state, &next);
            *state = next;
        });
    }

    /// Background delivery loop: polls the session and forwards events until
    /// shutdown is requested or the initial connection attempt fails.
    async fn run_event_loop(mut ctx: DeliveryContext, mut event_loop: EventLoop) {
        info!(client_id = %ctx.client_id, "Starting MQTT delivery loop");
        let mut ever_connected = false;

        loop {
            if *ctx.shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = ctx.shutdown_rx.changed() => {
                    if changed.is_err() || *ctx.shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping delivery loop");
                        break;
                    }
                }

                event_result = event_loop.poll() => {
                    match event_result {
                        Ok(event) => {
                            let route = MessageHandler::route_mqtt_event(&event);
                            if matches!(route, EventRoute::ConnectionAcknowledged { .. }) {
                                ever_connected = true;
                            }
                            Self::process_event_route(route, &ctx).await;
                        }
                        Err(e) => {
                            let reason = e.to_string();
                            Self::transition(
                                &ctx.state_tx,
                                ConnectionEvent::NetworkError(reason.clone()),
                            );

                            if !ever_connected {
                                // Initial handshake failed: no retry, connect() reports it
                                break;
                            }

                            ctx.event_forwarder
                                .lock()
                                .await
                                .forward(TransportEvent::Disconnected { reason })
                                .await;

                            if !Self::interruptible_sleep(ctx.shutdown_rx.clone(), ctx.retry_delay).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        if ever_connected {
            Self::flush_disconnect(&ctx.client, &mut event_loop).await;
        }
        info!(client_id = %ctx.client_id, "MQTT delivery loop stopped");
    }

    /// Process routed MQTT event
    async fn process_event_route(route: EventRoute, ctx: &DeliveryContext) {
        match route {
            EventRoute::ConnectionAcknowledged { session_present } => {
                info!(session_present, "Connection returned result: Success");
                Self::transition(&ctx.state_tx, ConnectionEvent::ConnAckReceived);
                Self::resubscribe_to_topics(&ctx.client, &ctx.subscribed_topics).await;
                ctx.event_forwarder
                    .lock()
                    .await
                    .forward(TransportEvent::Connected { session_present })
                    .await;
            }
            EventRoute::MessageReceived { topic, payload } => {
                info!(
                    topic = %topic,
                    payload = %MessageHandler::describe_payload(&payload),
                    "Message received"
                );
                ctx.event_forwarder
                    .lock()
                    .await
                    .forward(TransportEvent::Message { topic, payload })
                    .await;
            }
            EventRoute::Disconnected { reason } => {
                Self::transition(
                    &ctx.state_tx,
                    ConnectionEvent::DisconnectedByBroker(reason.clone()),
                );
                ctx.event_forwarder
                    .lock()
                    .await
                    .forward(TransportEvent::Disconnected { reason })
                    .await;
            }
            EventRoute::SubscriptionConfirmed {
                packet_id,
                failures,
            } => {
                if failures.is_empty() {
                    info!(packet_id, "Subscribed");
                } else {
                    error!(packet_id, ?failures, "Subscription rejected by broker");
                }
            }
            EventRoute::InfrastructureEvent(event_str) => {
                debug!(target: "mqtt_transport", "MQTT event: {}", event_str);
            }
            EventRoute::OutgoingEvent => {}
        }
    }

    /// Send DISCONNECT and poll until the session closes or the timeout hits
    async fn flush_disconnect(client: &AsyncClient, event_loop: &mut EventLoop) {
        let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            // try_disconnect never blocks on a full request channel
            if let Err(e) = client.try_disconnect() {
                warn!("Failed to queue MQTT disconnect: {}", e);
                return;
            }
            while event_loop.poll().await.is_ok() {}
        })
        .await;

        if drained.is_err() {
            warn!("Timed out flushing MQTT disconnect");
        }
    }

    /// Perform interruptible sleep with shutdown monitoring
    /// Returns true if sleep completed, false if shutdown requested
    async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay: Duration) -> bool {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Shutdown signal received during retry delay, stopping");
                    return false;
                }
                true
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Helper to resubscribe to topics after reconnection
    async fn resubscribe_to_topics(client: &AsyncClient, topics: &Arc<Mutex<Vec<String>>>) {
        for topic in topics.lock().await.iter() {
            if let Err(e) = client.subscribe(topic.as_str(), QoS::AtLeastOnce).await {
                error!("Failed to re-subscribe to {}: {}", topic, e);
            } else {
                debug!(target: "mqtt_transport", "Re-subscribed to: {}", topic);
            }
        }
    }

    /// Check connection state before operations
    fn check_connection_state(&self) -> Result<(), MqttError> {
        let current_state = self.state_rx.borrow().clone();
        if !current_state.can_publish() {
            return Err(MqttError::NotConnected {
                state: current_state,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&self) -> Result<(), Self::Error> {
        let event_loop = self
            .event_loop
            .lock()
            .await
            .take()
            .ok_or(MqttError::EventLoopStarted)?;

        Self::transition(&self.state_tx, ConnectionEvent::ConnectStarted);
        info!(client_id = %self.client_id, "Connecting to MQTT broker");

        let ctx = DeliveryContext {
            client_id: self.client_id.clone(),
            client: self.client.clone(),
            state_tx: self.state_tx.clone(),
            shutdown_rx: self.shutdown_tx.subscribe(),
            subscribed_topics: self.subscribed_topics.clone(),
            event_forwarder: self.event_forwarder.clone(),
            retry_delay: self.retry_delay,
        };
        let span = mqtt_span!(client_id = %self.client_id);
        let handle = tokio::spawn(Self::run_event_loop(ctx, event_loop).instrument(span));
        *self.event_loop_handle.lock().await = Some(handle);

        // Only a ConnAck counts as connected
        Self::wait_for_connection_confirmation(self.state_rx.clone(), self.connect_timeout).await
    }

    async fn subscribe(&self, topic: &str) -> Result<(), Self::Error> {
        let current_state = self.state_rx.borrow().clone();
        if !current_state.can_subscribe() {
            return Err(MqttError::NotConnected {
                state: current_state,
            });
        }

        info!("Subscribing to topic: {}", topic);
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| {
                MqttError::SubscriptionFailed(format!("Failed to subscribe to {topic}: {e}").into())
            })?;

        let mut topics = self.subscribed_topics.lock().await;
        if !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_string());
        }
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        self.check_connection_state()?;

        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(Box::new(e)))?;

        debug!(target: "mqtt_transport", "Queued publish to {}", topic);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Self::Error> {
        self.shutdown_tx.send_replace(true);

        if let Some(mut handle) = self.event_loop_handle.lock().await.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT * 2, &mut handle).await {
                Ok(Ok(())) => info!("Delivery loop shut down gracefully"),
                Ok(Err(e)) => warn!("Delivery loop ended with error: {}", e),
                Err(_) => {
                    warn!("Delivery loop didn't shut down gracefully, forcing abort");
                    handle.abort();
                }
            }
        }

        self.event_forwarder.lock().await.clear();
        Self::transition(&self.state_tx, ConnectionEvent::ClosedByClient);

        info!("MQTT client disconnected");
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    async fn set_event_sender(&self, sender: mpsc::Sender<TransportEvent>) {
        self.event_forwarder.lock().await.set_sender(sender);
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Signal shutdown to background tasks if they're still running
        self.shutdown_tx.send_replace(true);

        if let Some(handle) = self.event_loop_handle.get_mut().take() {
            handle.abort();
        }
    }
}
