//! Credential verification.
//!
//! # Pre-conditions
//! - Stored hashes are PHC strings produced by [`SecretHasher`].
//!
//! # Post-conditions
//! - On success, returns the subject, username and role snapshot.
//! - The plaintext secret and the stored hash are never returned or logged.
//!
//! # Invariants
//! - Every lookup that finds or misses a user costs exactly one hash
//!   verification, whatever the outcome.
//! - Account-status checks run in order: disabled, locked, credentials
//!   expired, account expired. Only then is the secret checked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use super::password::{HashError, SecretHasher};
use crate::clock::Clock;
use crate::error::AuthError;
use crate::store::UserStore;
use crate::types::{Credential, RoleSet, UserId, UserRecord};

/// Identity established by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: UserId,
    pub username: String,
    pub roles: RoleSet,
}

/// Checks presented secrets against stored salted hashes.
pub struct CredentialVerifier {
    store: Arc<dyn UserStore>,
    hasher: SecretHasher,
    clock: Arc<dyn Clock>,
    /// Hash checked when no user matches, so a miss takes as long as a hit.
    dummy_hash: OnceLock<Option<String>>,
    hash_verifications: AtomicU64,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, hasher: SecretHasher, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            hasher,
            clock,
            dummy_hash: OnceLock::new(),
            hash_verifications: AtomicU64::new(0),
        }
    }

    /// Number of hash verifications run so far, dummy ones included.
    #[must_use]
    pub fn hash_verifications(&self) -> u64 {
        self.hash_verifications.load(Ordering::Relaxed)
    }

    /// Verify `credential` and return the identity it proves.
    ///
    /// # Errors
    /// - `StoreUnavailable` if the lookup fails.
    /// - `NotFound` if no user matches the identifier.
    /// - `AccountDisabled`, `AccountLocked`, `CredentialsExpired` or
    ///   `AccountExpired` if the account may not log in.
    /// - `BadCredentials` if the secret does not match.
    pub fn verify(&self, credential: &Credential) -> Result<VerifiedIdentity, AuthError> {
        let user = self
            .store
            .find_by_identifier(&credential.identifier)
            .map_err(|e| {
                tracing::warn!("user lookup failed: {e}");
                AuthError::from(e)
            })?;

        let Some(user) = user else {
            self.burn_dummy_verification(&credential.secret);
            return Err(AuthError::NotFound);
        };

        if let Err(e) = check_status(&user) {
            let _ = self.verify_secret(&credential.secret, user.password_hash());
            return Err(e);
        }

        match self.verify_secret(&credential.secret, user.password_hash()) {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::BadCredentials),
            Err(HashError::MalformedHash) => {
                tracing::error!(user_id = %user.id, "stored password hash is malformed");
                return Err(AuthError::BadCredentials);
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, "password verification failed: {e}");
                return Err(AuthError::BadCredentials);
            }
        }

        if let Err(e) = self.store.touch_last_login(&user.id, self.clock.now_ms()) {
            tracing::warn!(user_id = %user.id, "failed to record last login: {e}");
        }

        Ok(VerifiedIdentity {
            subject: user.id,
            username: user.username,
            roles: user.roles,
        })
    }

    fn burn_dummy_verification(&self, secret: &str) {
        let dummy = self
            .dummy_hash
            .get_or_init(|| self.hasher.hash("dummy-secret-for-timing").ok());
        if let Some(hash) = dummy {
            let _ = self.verify_secret(secret, hash);
        }
    }

    fn verify_secret(&self, secret: &str, hash: &str) -> Result<bool, HashError> {
        self.hash_verifications.fetch_add(1, Ordering::Relaxed);
        self.hasher.verify(secret, hash)
    }
}

/// Reject accounts that may not log in, in a fixed order.
///
/// # Errors
/// Returns the first failing status as an `AuthError`.
pub fn check_status(user: &UserRecord) -> Result<(), AuthError> {
    let status = &user.status;
    if !status.enabled {
        return Err(AuthError::AccountDisabled);
    }
    if !status.account_non_locked {
        return Err(AuthError::AccountLocked);
    }
    if !status.credentials_non_expired {
        return Err(AuthError::CredentialsExpired);
    }
    if !status.account_non_expired {
        return Err(AuthError::AccountExpired);
    }
    Ok(())
}
