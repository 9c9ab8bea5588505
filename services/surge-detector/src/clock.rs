//! Time source injected into the detector, read once per analysis cycle.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Clock that only moves when told to. Used by tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self { Self { now: Mutex::new(start) } }
    pub fn set(&self, t: DateTime<Utc>) { *self.now.lock() = t; }
    pub fn advance(&self, by: Duration) { *self.now.lock() += by; }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> { *self.now.lock() }
}
