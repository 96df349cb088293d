//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for exercising the telemetry
//! agent without a broker, sensor hardware or a real clock.

pub mod mocks;

pub use mocks::*;
