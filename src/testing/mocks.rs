//! Mock implementations for testing
//!
//! Provides a mock Transport, a scripted sensor and a manual clock so the
//! cadence loop and supervisor can be exercised without a broker, hardware or
//! wall-clock time.

use crate::clock::Clock;
use crate::error::AgentError;
use crate::sensor::{SensorSample, SensorSource};
use crate::transport::{ConnectionState, Transport, TransportEvent};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub type PublishedMessage = (String, Vec<u8>);

/// Mock transport for testing
///
/// `connect()` forwards a `Connected` event to the registered sender, the way
/// the MQTT client does on ConnAck.
#[derive(Debug)]
pub struct MockTransport {
    published_messages: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<String>>,
    state: Mutex<ConnectionState>,
    event_sender: tokio::sync::Mutex<Option<mpsc::Sender<TransportEvent>>>,
    fail_connect: bool,
    fail_subscribe: bool,
    fail_publish: AtomicBool,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            published_messages: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            state: Mutex::new(ConnectionState::Idle),
            event_sender: tokio::sync::Mutex::new(None),
            fail_connect: false,
            fail_subscribe: false,
            fail_publish: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose handshake always fails
    pub fn with_connect_failure() -> Self {
        Self {
            fail_connect: true,
            ..Default::default()
        }
    }

    /// Transport that connects but rejects subscriptions
    pub fn with_subscribe_failure() -> Self {
        Self {
            fail_subscribe: true,
            ..Default::default()
        }
    }

    /// Toggle publish failures at runtime
    pub fn set_publish_failure(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Push an event as if it came from the broker
    pub async fn emit(&self, event: TransportEvent) -> bool {
        match self.event_sender.lock().await.as_ref() {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        lock(&self.published_messages).clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        lock(&self.subscriptions).clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for MockTransport {
    type Error = AgentError;

    async fn connect(&self) -> Result<(), Self::Error> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.set_state(ConnectionState::Connecting);

        if self.fail_connect {
            self.set_state(ConnectionState::Disconnected(
                "Mock handshake failure".to_string(),
            ));
            return Err(AgentError::connection_failed("Mock handshake failure"));
        }

        self.set_state(ConnectionState::Connected);
        self.emit(TransportEvent::Connected {
            session_present: false,
        })
        .await;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), Self::Error> {
        if self.fail_subscribe {
            return Err(AgentError::subscription_failed(format!(
                "Mock subscription failure for {topic}"
            )));
        }
        lock(&self.subscriptions).push(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(AgentError::TransportError("Mock publish failure".into()));
        }
        lock(&self.published_messages).push((topic.to_string(), payload));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Self::Error> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        // Dropping the sender ends the event stream
        self.event_sender.lock().await.take();
        self.set_state(ConnectionState::Disconnected(
            "Client disconnected".to_string(),
        ));
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        lock(&self.state).clone()
    }

    async fn set_event_sender(&self, sender: mpsc::Sender<TransportEvent>) {
        *self.event_sender.lock().await = Some(sender);
    }
}

/// Sensor that replays a fixed list of samples, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    samples: Vec<SensorSample>,
    next: usize,
}

impl ScriptedSensor {
    /// Replay `samples` in order. An empty script yields zeros.
    pub fn new(samples: Vec<SensorSample>) -> Self {
        Self { samples, next: 0 }
    }

    pub fn constant(humidity: f64, temperature: f64) -> Self {
        Self::new(vec![SensorSample {
            humidity,
            temperature,
        }])
    }
}

impl SensorSource for ScriptedSensor {
    fn sample(&mut self) -> SensorSample {
        if self.samples.is_empty() {
            return SensorSample {
                humidity: 0.0,
                temperature: 0.0,
            };
        }
        let sample = self.samples[self.next % self.samples.len()];
        self.next += 1;
        sample
    }
}

/// Clock that advances one second every time it is read
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn starting_at(start: NaiveDateTime) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }
}

impl Default for ManualClock {
    /// Starts at 2024-01-01 12:00:00
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .unwrap_or_default();
        Self::starting_at(start)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        let mut current = lock(&self.current);
        let now = *current;
        *current = now + chrono::Duration::seconds(1);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_records_publishes() {
        let transport = MockTransport::new();
        transport.connect().await.unwrap();

        transport
            .publish("sensor/data", b"{}".to_vec())
            .await
            .unwrap();

        assert_eq!(
            transport.published_messages(),
            vec![("sensor/data".to_string(), b"{}".to_vec())]
        );
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_mock_transport_failures() {
        let transport = MockTransport::with_connect_failure();
        assert!(transport.connect().await.is_err());
        assert!(!transport.is_connected());

        let transport = MockTransport::with_subscribe_failure();
        assert!(transport.subscribe("control/commands").await.is_err());

        let transport = MockTransport::new();
        transport.set_publish_failure(true);
        assert!(transport.publish("sensor/data", vec![]).await.is_err());
        assert!(transport.published_messages().is_empty());
    }

    #[tokio::test]
    async fn test_connect_emits_connected_event() {
        let transport = MockTransport::new();
        let (tx, mut rx) = mpsc::channel(4);
        transport.set_event_sender(tx).await;

        transport.connect().await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(TransportEvent::Connected {
                session_present: false
            })
        );

        transport.disconnect().await.unwrap();
        assert_eq!(rx.recv().await, None);
        assert_eq!(transport.disconnect_calls(), 1);
    }

    #[test]
    fn test_scripted_sensor_cycles() {
        let mut sensor = ScriptedSensor::new(vec![
            SensorSample {
                humidity: 40.0,
                temperature: 20.0,
            },
            SensorSample {
                humidity: 41.0,
                temperature: 21.0,
            },
        ]);

        assert_eq!(sensor.sample().humidity, 40.0);
        assert_eq!(sensor.sample().humidity, 41.0);
        assert_eq!(sensor.sample().humidity, 40.0);
    }

    #[test]
    fn test_manual_clock_advances_per_read() {
        let clock = ManualClock::default();
        let first = clock.now();
        let second = clock.now();

        assert_eq!(second - first, chrono::Duration::seconds(1));
        assert_eq!(first.to_string(), "2024-01-01 12:00:00");
    }
}
