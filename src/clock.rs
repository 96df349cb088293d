//! Wall-clock source for reading timestamps
//!
//! Readings are stamped with local time. The cadence loop takes the clock as a
//! trait object so tests can substitute a deterministic one.

use chrono::{Local, NaiveDateTime};

/// Source of the current local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// System clock in the process's local time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
