//! Fault injection at the store boundaries.
//!
//! The wrappers forward to a real store and, with a seeded probability,
//! fail the call with `StoreError::Unavailable` instead. The decision
//! sequence depends only on the seed, so a failing run can be replayed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::StoreError;
use crate::revocation::RevocationStore;
use crate::store::UserStore;
use crate::types::{AccountStatus, RoleSet, TokenId, UserId, UserRecord};

/// Configuration for fault injection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultConfig {
    /// Probability that a user store read fails (0.0 - 1.0).
    pub user_read_error_rate: f64,
    /// Probability that a user store write fails (0.0 - 1.0).
    pub user_write_error_rate: f64,
    /// Probability that a revocation lookup fails (0.0 - 1.0).
    pub revocation_read_error_rate: f64,
    /// Probability that a revocation write fails (0.0 - 1.0).
    pub revocation_write_error_rate: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::no_faults()
    }
}

impl FaultConfig {
    /// Create a fault config with no faults (for baseline testing).
    #[must_use]
    pub const fn no_faults() -> Self {
        Self {
            user_read_error_rate: 0.0,
            user_write_error_rate: 0.0,
            revocation_read_error_rate: 0.0,
            revocation_write_error_rate: 0.0,
        }
    }

    /// Create a fault config with low fault rates (for stress testing).
    #[must_use]
    pub const fn low_faults() -> Self {
        Self {
            user_read_error_rate: 0.01,
            user_write_error_rate: 0.01,
            revocation_read_error_rate: 0.01,
            revocation_write_error_rate: 0.01,
        }
    }

    /// Create a fault config with high fault rates (for extreme testing).
    #[must_use]
    pub const fn high_faults() -> Self {
        Self {
            user_read_error_rate: 0.2,
            user_write_error_rate: 0.2,
            revocation_read_error_rate: 0.2,
            revocation_write_error_rate: 0.2,
        }
    }
}

/// Seeded coin shared by a wrapper's operations.
#[derive(Debug)]
struct FaultDice {
    rng: Mutex<StdRng>,
    injected: AtomicU64,
}

impl FaultDice {
    fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            injected: AtomicU64::new(0),
        }
    }

    fn roll(&self, rate: f64, what: &str) -> Result<(), StoreError> {
        if rate <= 0.0 {
            return Ok(());
        }
        let hit = match self.rng.lock() {
            Ok(mut rng) => rng.random_bool(rate.min(1.0)),
            Err(poisoned) => poisoned.into_inner().random_bool(rate.min(1.0)),
        };
        if hit {
            self.injected.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::Unavailable(format!("injected {what} fault")));
        }
        Ok(())
    }

    fn injected(&self) -> u64 {
        self.injected.load(Ordering::Relaxed)
    }
}

/// A [`UserStore`] that fails some calls on purpose.
pub struct FaultyUserStore {
    inner: Arc<dyn UserStore>,
    config: FaultConfig,
    dice: FaultDice,
}

impl FaultyUserStore {
    #[must_use]
    pub fn new(inner: Arc<dyn UserStore>, seed: u64, config: FaultConfig) -> Self {
        Self {
            inner,
            config,
            dice: FaultDice::new(seed),
        }
    }

    /// Number of faults injected so far.
    #[must_use]
    pub fn injected_faults(&self) -> u64 {
        self.dice.injected()
    }

    fn read(&self) -> Result<(), StoreError> {
        self.dice.roll(self.config.user_read_error_rate, "user read")
    }

    fn write(&self) -> Result<(), StoreError> {
        self.dice.roll(self.config.user_write_error_rate, "user write")
    }
}

impl UserStore for FaultyUserStore {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserRecord>, StoreError> {
        self.read()?;
        self.inner.find_by_identifier(identifier)
    }

    fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        self.read()?;
        self.inner.find_by_id(id)
    }

    fn touch_last_login(&self, id: &UserId, at_ms: u64) -> Result<(), StoreError> {
        self.write()?;
        self.inner.touch_last_login(id, at_ms)
    }

    fn insert(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        self.write()?;
        self.inner.insert(record)
    }

    fn add_role(&self, id: &UserId, role: &str, now_ms: u64) -> Result<RoleSet, StoreError> {
        self.write()?;
        self.inner.add_role(id, role, now_ms)
    }

    fn remove_role(&self, id: &UserId, role: &str, now_ms: u64) -> Result<RoleSet, StoreError> {
        self.write()?;
        self.inner.remove_role(id, role, now_ms)
    }

    fn set_status(
        &self,
        id: &UserId,
        status: AccountStatus,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        self.write()?;
        self.inner.set_status(id, status, now_ms)
    }
}

/// A [`RevocationStore`] that fails some calls on purpose.
///
/// `prune` and `len` are never faulted; the simulator uses them to inspect
/// the registry.
pub struct FaultyRevocationStore {
    inner: Arc<dyn RevocationStore>,
    config: FaultConfig,
    dice: FaultDice,
}

impl FaultyRevocationStore {
    #[must_use]
    pub fn new(inner: Arc<dyn RevocationStore>, seed: u64, config: FaultConfig) -> Self {
        Self {
            inner,
            config,
            dice: FaultDice::new(seed),
        }
    }

    /// Number of faults injected so far.
    #[must_use]
    pub fn injected_faults(&self) -> u64 {
        self.dice.injected()
    }
}

impl RevocationStore for FaultyRevocationStore {
    fn revoke(&self, token_id: TokenId, expires_at_ms: u64) -> Result<bool, StoreError> {
        self.dice
            .roll(self.config.revocation_write_error_rate, "revocation write")?;
        self.inner.revoke(token_id, expires_at_ms)
    }

    fn is_revoked(&self, token_id: &TokenId) -> Result<bool, StoreError> {
        self.dice
            .roll(self.config.revocation_read_error_rate, "revocation read")?;
        self.inner.is_revoked(token_id)
    }

    fn prune(&self, now_ms: u64) -> Result<usize, StoreError> {
        self.inner.prune(now_ms)
    }

    fn len(&self) -> Result<usize, StoreError> {
        self.inner.len()
    }
}
