//! Salted secret hashing.
//!
//! Secrets are hashed with Argon2id and stored as PHC strings, which record
//! the algorithm, version, cost parameters and salt alongside the digest.
//!
//! # Invariants
//! - Every call to `hash` uses a fresh random salt.
//! - `verify` uses the parameters recorded in the stored string, not the
//!   hasher's current parameters, so older records keep verifying after a
//!   cost change.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl HashParams {
    /// Recommended Argon2id parameters: 19 MiB, 2 passes, 1 lane.
    pub const RECOMMENDED: Self = Self {
        memory_kib: 19_456,
        iterations: 2,
        parallelism: 1,
    };

    /// The cheapest parameters Argon2 accepts. Only for tests and simulation.
    pub const MINIMAL: Self = Self {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    };
}

impl Default for HashParams {
    fn default() -> Self {
        Self::RECOMMENDED
    }
}

/// Error returned by the secret hasher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// The configured cost parameters are rejected by Argon2.
    InvalidParams(String),
    /// The stored hash is not a parseable PHC string.
    MalformedHash,
    /// Hashing failed for another reason.
    Hashing(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParams(reason) => write!(f, "invalid hash parameters: {reason}"),
            Self::MalformedHash => write!(f, "stored hash is malformed"),
            Self::Hashing(reason) => write!(f, "hashing failed: {reason}"),
        }
    }
}

impl std::error::Error for HashError {}

/// Hashes and verifies secrets.
#[derive(Debug, Clone)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    /// Create a hasher with the given cost parameters.
    ///
    /// # Errors
    /// Returns `HashError::InvalidParams` if Argon2 rejects the parameters.
    pub fn new(params: HashParams) -> Result<Self, HashError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| HashError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a secret with a fresh random salt.
    ///
    /// # Post-conditions
    /// - The result is a PHC string beginning with `$argon2id$`.
    pub fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Check a secret against a stored PHC string in constant time.
    ///
    /// # Errors
    /// Returns `HashError::MalformedHash` if `stored` cannot be parsed.
    pub fn verify(&self, secret: &str, stored: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(stored).map_err(|_| HashError::MalformedHash)?;
        match self.argon2().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(password_hash::Error::Algorithm | password_hash::Error::ParamNameInvalid) => {
                Err(HashError::MalformedHash)
            }
            Err(e) => Err(HashError::Hashing(e.to_string())),
        }
    }
}
