//! Simulated clock for deterministic testing.
//!
//! Time only moves when a test or the simulator says so, which makes expiry
//! and pruning behavior reproducible.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock::Clock;

/// A clock that advances only when told to.
///
/// Backed by an atomic so it can be shared with the issuer, the validator and
/// the prune task at once.
///
/// # Example
///
/// ```
/// use auth_service::clock::Clock;
/// use auth_service::simulation::SimulatedClock;
///
/// let clock = SimulatedClock::new(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 1100);
///
/// clock.set(5000);
/// assert_eq!(clock.now_ms(), 5000);
/// ```
#[derive(Debug)]
pub struct SimulatedClock {
    /// Current simulated time in milliseconds since Unix epoch.
    current_time_ms: AtomicU64,
}

impl SimulatedClock {
    /// Create a clock reading `initial_time_ms`.
    #[must_use]
    pub const fn new(initial_time_ms: u64) -> Self {
        Self {
            current_time_ms: AtomicU64::new(initial_time_ms),
        }
    }

    /// Create a clock starting at `1_700_000_000_000` (November 2023).
    #[must_use]
    pub const fn default_start() -> Self {
        Self::new(1_700_000_000_000)
    }

    /// Advance time by `ms`, saturating at `u64::MAX`.
    pub fn advance(&self, ms: u64) {
        let _ = self
            .current_time_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(ms))
            });
    }

    /// Set the current time. May move time backwards.
    pub fn set(&self, time_ms: u64) {
        self.current_time_ms.store(time_ms, Ordering::SeqCst);
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.current_time_ms.load(Ordering::SeqCst)
    }
}

impl Clock for SimulatedClock {
    fn now_ms(&self) -> u64 {
        self.current()
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::default_start()
    }
}
