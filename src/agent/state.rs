//! Run state of the telemetry agent
//!
//! The agent's state is a single enumerated value owned by the cadence loop.
//! Transitions are computed by a pure function so the whole table can be
//! exercised without a broker or a timer.

use crate::protocol::Command;
use std::fmt;

/// What a running agent does on each cadence tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// No ConnAck observed yet; ticks are skipped
    AwaitingConnection,
    /// Ticks sample, encode and publish
    Publishing,
    /// An operator paused publishing
    Paused,
}

/// Agent lifecycle state. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Running(RunMode),
    Stopped,
}

/// Inputs to the state machine, produced by the cadence loop from transport events
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    ConnectionEstablished,
    ConnectionLost(String),
    Command(Command),
    MalformedCommand(String),
}

/// Result of applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed { from: AgentState, to: AgentState },
    Unchanged(AgentState),
}

impl Transition {
    /// State after the event
    pub fn state(&self) -> AgentState {
        match self {
            Transition::Changed { to, .. } => *to,
            Transition::Unchanged(state) => *state,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Transition::Changed { .. })
    }
}

impl Default for AgentState {
    fn default() -> Self {
        AgentState::Running(RunMode::AwaitingConnection)
    }
}

impl AgentState {
    /// Compute the next state for `event` (pure function)
    pub fn apply(self, event: &AgentEvent) -> Transition {
        use AgentState::{Running, Stopped};
        use RunMode::{AwaitingConnection, Paused, Publishing};

        let next = match (self, event) {
            (Stopped, _) => Stopped,
            (Running(_), AgentEvent::Command(Command::Stop)) => Stopped,
            (Running(AwaitingConnection), AgentEvent::ConnectionEstablished) => {
                Running(Publishing)
            }
            (Running(Publishing), AgentEvent::Command(Command::Pause)) => Running(Paused),
            (Running(Paused), AgentEvent::Command(Command::Resume)) => Running(Publishing),
            (state, _) => state,
        };

        if next == self {
            Transition::Unchanged(self)
        } else {
            Transition::Changed {
                from: self,
                to: next,
            }
        }
    }

    /// Whether a tick in this state publishes a reading
    pub fn is_publishing(&self) -> bool {
        matches!(self, AgentState::Running(RunMode::Publishing))
    }

    pub fn is_running(&self) -> bool {
        matches!(self, AgentState::Running(_))
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Running(RunMode::AwaitingConnection) => f.write_str("running (awaiting connection)"),
            AgentState::Running(RunMode::Publishing) => f.write_str("running (publishing)"),
            AgentState::Running(RunMode::Paused) => f.write_str("running (paused)"),
            AgentState::Stopped => f.write_str("stopped"),
        }
    }
}
