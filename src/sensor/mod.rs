//! Sensor sources for the telemetry agent
//!
//! A [`SensorSource`] stands in for hardware I/O. Implementations must always
//! return a plausible reading: faults are absorbed inside the source (by
//! repeating the last known value) and never propagated to the cadence loop.

pub mod pseudo;

pub use pseudo::PseudoSensor;

/// Raw humidity/temperature pair, before it is timestamped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Relative humidity in percent
    pub humidity: f64,
    /// Temperature in degrees Celsius
    pub temperature: f64,
}

/// Produces a reading on demand
pub trait SensorSource: Send {
    /// Take one sample. Infallible by contract.
    fn sample(&mut self) -> SensorSample;
}
