//! Time source abstraction.
//!
//! Core logic never reads the operating system clock directly. Every
//! component that needs "now" receives a [`Clock`], so token issuance and
//! validation stay deterministic under test.

use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction over the current time.
///
/// Implementations must be shareable across request handlers.
pub trait Clock: Send + Sync {
    /// Get the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;

    /// Get the current time in whole seconds since Unix epoch.
    fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}

/// Real time source using the system clock.
///
/// This is the implementation wired in by `main`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::cast_possible_truncation)] // Milliseconds won't overflow u64 for billions of years
    fn now_ms(&self) -> u64 {
        // A clock set before 1970 is treated as the epoch itself.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_millis() as u64)
    }
}
