//! Wire-level message types for the telemetry agent
//!
//! This module defines the telemetry and control payloads, their codecs, and
//! the topic names they travel on.

pub mod codec;
pub mod messages;
pub mod topics;

pub use codec::*;
pub use messages::*;
pub use topics::*;
