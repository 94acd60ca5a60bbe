//! Clock trait - abstracts time operations for testability.

use chrono::{DateTime, Utc};

/// Clock abstraction so TTL and timestamp logic is deterministic in tests.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
