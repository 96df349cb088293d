//! Synthetic humidity/temperature sensor
//!
//! Values follow a bounded Gaussian random walk so consecutive readings look
//! like a slowly drifting environment rather than white noise.

use super::{SensorSample, SensorSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::ops::RangeInclusive;
use tracing::warn;

/// Physical range reported for relative humidity (%RH)
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 0.0..=100.0;
/// Physical range reported for temperature (degrees Celsius)
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = -20.0..=60.0;

const DEFAULT_HUMIDITY_STEP: f64 = 1.0;
const DEFAULT_TEMPERATURE_STEP: f64 = 0.5;

/// Pseudo-random sensor with internal random-walk state
pub struct PseudoSensor {
    rng: StdRng,
    humidity_step: f64,
    temperature_step: f64,
    last: SensorSample,
}

impl PseudoSensor {
    /// Create a sensor with the default step sizes.
    ///
    /// A seed makes the sequence reproducible; `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_steps(seed, DEFAULT_HUMIDITY_STEP, DEFAULT_TEMPERATURE_STEP)
    }

    /// Create a sensor with custom per-sample standard deviations
    pub fn with_steps(seed: Option<u64>, humidity_step: f64, temperature_step: f64) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let last = SensorSample {
            humidity: round_tenth(rng.gen_range(30.0..70.0)),
            temperature: round_tenth(rng.gen_range(15.0..30.0)),
        };

        Self {
            rng,
            humidity_step: step_size("humidity", humidity_step, DEFAULT_HUMIDITY_STEP),
            temperature_step: step_size("temperature", temperature_step, DEFAULT_TEMPERATURE_STEP),
            last,
        }
    }

    /// Most recent value handed out (or the initial state before any sample)
    pub fn last_sample(&self) -> SensorSample {
        self.last
    }
}

impl SensorSource for PseudoSensor {
    fn sample(&mut self) -> SensorSample {
        let humidity_draw: f64 = self.rng.sample(StandardNormal);
        let temperature_draw: f64 = self.rng.sample(StandardNormal);

        let humidity = walk(
            self.last.humidity,
            humidity_draw * self.humidity_step,
            &HUMIDITY_RANGE,
        );
        let temperature = walk(
            self.last.temperature,
            temperature_draw * self.temperature_step,
            &TEMPERATURE_RANGE,
        );

        self.last = SensorSample {
            humidity,
            temperature,
        };
        self.last
    }
}

/// Standard deviation of one step; non-finite or negative sizes fall back
fn step_size(channel: &str, std_dev: f64, fallback: f64) -> f64 {
    if std_dev.is_finite() && std_dev >= 0.0 {
        return std_dev;
    }
    warn!(
        channel = channel,
        std_dev = std_dev,
        fallback = fallback,
        "Invalid sensor step size, using default"
    );
    fallback
}

/// Advance one random-walk step, keeping the last value on a non-finite draw
fn walk(last: f64, delta: f64, range: &RangeInclusive<f64>) -> f64 {
    let next = last + delta;
    if !next.is_finite() {
        return last;
    }
    round_tenth(next.clamp(*range.start(), *range.end()))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
