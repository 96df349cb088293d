//! Telemetry agent core
//!
//! - [`state`] - enumerated run state and its pure transition table
//! - [`runner`] - the cadence loop that owns the state and publishes readings
//! - [`supervisor`] - connect, subscribe, run until stopped, disconnect

pub mod runner;
pub mod state;
pub mod supervisor;

pub use runner::{RunSummary, TelemetryAgent, DEFAULT_PUBLISH_INTERVAL};
pub use state::{AgentEvent, AgentState, RunMode, Transition};
pub use supervisor::{Supervisor, EVENT_CHANNEL_CAPACITY};
