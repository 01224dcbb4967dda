//! Revocation registry.
//!
//! Tracks tokens invalidated before their natural expiry. An entry only
//! needs to live until the token would have expired anyway, so the registry
//! is bounded by the number of outstanding tokens, not by the number ever
//! issued.
//!
//! # Invariants
//! - `revoke` is idempotent.
//! - An entry inserted before an `is_revoked` call starts is always seen by it.
//! - `prune(now)` removes exactly the entries with `expires_at_ms < now`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::types::TokenId;

/// Contract for any revocation backend, in-memory or external.
///
/// Expiries are milliseconds since the Unix epoch.
pub trait RevocationStore: Send + Sync {
    /// Mark `token_id` revoked until `expires_at_ms`.
    ///
    /// Returns `true` if this call inserted the entry and `false` if the
    /// token was already revoked. The registry state is the same either way.
    fn revoke(&self, token_id: TokenId, expires_at_ms: u64) -> Result<bool, StoreError>;

    fn is_revoked(&self, token_id: &TokenId) -> Result<bool, StoreError>;

    /// Drop entries whose token has expired. Returns the number removed.
    fn prune(&self, now_ms: u64) -> Result<usize, StoreError>;

    /// Number of entries currently held.
    fn len(&self) -> Result<usize, StoreError>;
}

/// In-process registry backed by a lock-protected map.
///
/// Every operation holds the lock for a single map operation (or a single
/// `retain` pass for `prune`), so readers and writers never wait long.
#[derive(Debug, Default)]
pub struct InMemoryRevocationRegistry {
    entries: RwLock<HashMap<TokenId, u64>>,
}

impl InMemoryRevocationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("revocation registry lock poisoned".to_string())
}

impl RevocationStore for InMemoryRevocationRegistry {
    fn revoke(&self, token_id: TokenId, expires_at_ms: u64) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        // Keep the first expiry: a second revoke of the same id is a no-op.
        match entries.entry(token_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(expires_at_ms);
                Ok(true)
            }
        }
    }

    fn is_revoked(&self, token_id: &TokenId) -> Result<bool, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.contains_key(token_id))
    }

    fn prune(&self, now_ms: u64) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let before = entries.len();
        entries.retain(|_, expires_at_ms| *expires_at_ms >= now_ms);
        Ok(before - entries.len())
    }

    fn len(&self) -> Result<usize, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.len())
    }
}
