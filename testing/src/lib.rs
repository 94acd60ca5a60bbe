//! Test doubles for the cake picnic portal.
//!
//! # Example
//!
//! ```
//! use cakepicnic_testing::{test_clock, InMemoryPortalStore, MockLedgerClient};
//! use cakepicnic_core::clock::Clock;
//!
//! let store = InMemoryPortalStore::new();
//! let ledger = MockLedgerClient::new();
//! let clock = test_clock();
//! assert_eq!(clock.now(), clock.now()); // deterministic
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ledger;
pub mod stores;

use cakepicnic_core::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Fixed clock for deterministic tests.
///
/// Starts at a given instant and only moves when [`FixedClock::advance`] is
/// called, making TTL expiry testable without real waiting.
#[derive(Clone, Debug)]
pub struct FixedClock {
    time: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// Create a fixed clock at the given instant.
    #[must_use]
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    /// Move the clock forward.
    ///
    /// # Panics
    ///
    /// Panics if the clock mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.lock().unwrap();
        *time += by;
    }
}

impl Clock for FixedClock {
    #[allow(clippy::unwrap_used)]
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap()
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
///
/// # Panics
///
/// This function will panic if the hardcoded timestamp fails to parse,
/// which should never happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

pub use ledger::MockLedgerClient;
pub use stores::{InMemoryPortalStore, RecordingMediaStore};
