//! Signing key material and the process-wide key ring.
//!
//! # Pre-conditions
//! - HS256 secrets are at least [`MIN_HS256_SECRET_LEN`] bytes.
//! - RS256 keys are PEM encoded; the private key signs, the public key verifies.
//!
//! # Post-conditions
//! - `SigningKeys` instances are immutable once created.
//!
//! # Invariants
//! - Rotation swaps the whole `Arc<SigningKeys>`; keys are never mutated in place.
//! - The HS256 secret and RS256 private key never leave this module except
//!   as an opaque `EncodingKey`.

use std::fmt;
use std::sync::{Arc, RwLock};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use crate::error::AuthError;

/// Minimum HS256 secret length (256 bits).
pub const MIN_HS256_SECRET_LEN: usize = 32;

/// Error returned when key material is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The HS256 secret is empty.
    EmptySecret,
    /// The HS256 secret is shorter than [`MIN_HS256_SECRET_LEN`].
    SecretTooShort(usize),
    /// The RS256 private key is not a valid PEM-encoded RSA private key.
    InvalidRs256PrivateKey(String),
    /// The RS256 public key is not a valid PEM-encoded RSA public key.
    InvalidRs256PublicKey(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "HS256 secret must not be empty"),
            Self::SecretTooShort(len) => write!(
                f,
                "HS256 secret must be at least {MIN_HS256_SECRET_LEN} bytes, got {len}"
            ),
            Self::InvalidRs256PrivateKey(reason) => {
                write!(f, "invalid RS256 private key: {reason}")
            }
            Self::InvalidRs256PublicKey(reason) => {
                write!(f, "invalid RS256 public key: {reason}")
            }
        }
    }
}

impl std::error::Error for KeyError {}

/// Raw key material as loaded from configuration.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// HMAC-SHA256 with a shared secret that never leaves the service.
    Hs256 { secret: Vec<u8> },
    /// RSA-SHA256: PEM private key for signing, PEM public key for verification.
    Rs256 {
        private_key_pem: String,
        public_key_pem: String,
    },
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hs256 { secret } => f
                .debug_struct("Hs256")
                .field("secret_len", &secret.len())
                .finish(),
            Self::Rs256 { public_key_pem, .. } => f
                .debug_struct("Rs256")
                .field("public_key_pem", public_key_pem)
                .finish_non_exhaustive(),
        }
    }
}

/// Parsed keys for one algorithm.
#[derive(Clone)]
pub struct SigningKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    /// Parse key material into signing and verification keys.
    ///
    /// # Errors
    /// Returns a `KeyError` describing which part of the material is invalid.
    pub fn from_material(material: &KeyMaterial) -> Result<Self, KeyError> {
        match material {
            KeyMaterial::Hs256 { secret } => {
                if secret.is_empty() {
                    return Err(KeyError::EmptySecret);
                }
                if secret.len() < MIN_HS256_SECRET_LEN {
                    return Err(KeyError::SecretTooShort(secret.len()));
                }
                Ok(Self {
                    algorithm: Algorithm::HS256,
                    encoding: EncodingKey::from_secret(secret),
                    decoding: DecodingKey::from_secret(secret),
                })
            }
            KeyMaterial::Rs256 {
                private_key_pem,
                public_key_pem,
            } => {
                let encoding = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidRs256PrivateKey(e.to_string()))?;
                let decoding = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidRs256PublicKey(e.to_string()))?;
                Ok(Self {
                    algorithm: Algorithm::RS256,
                    encoding,
                    decoding,
                })
            }
        }
    }

    /// Convenience constructor for an HS256 secret.
    ///
    /// # Errors
    /// Returns `KeyError::EmptySecret` or `KeyError::SecretTooShort`.
    pub fn hs256(secret: &[u8]) -> Result<Self, KeyError> {
        Self::from_material(&KeyMaterial::Hs256 {
            secret: secret.to_vec(),
        })
    }

    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Process-wide holder of the current signing keys.
///
/// Readers clone the `Arc` under a short read lock and then work without any
/// lock held; rotation replaces the `Arc` under a short write lock.
#[derive(Debug, Default)]
pub struct KeyRing {
    current: RwLock<Option<Arc<SigningKeys>>>,
}

impl KeyRing {
    /// Create an empty key ring. Issuance fails until keys are installed.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a key ring holding `keys`.
    #[must_use]
    pub fn with_keys(keys: SigningKeys) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(keys))),
        }
    }

    /// The keys in effect right now.
    ///
    /// # Errors
    /// Returns `AuthError::SigningUnavailable` if no keys are loaded.
    pub fn current(&self) -> Result<Arc<SigningKeys>, AuthError> {
        let guard = self
            .current
            .read()
            .map_err(|_| AuthError::SigningUnavailable)?;
        guard.clone().ok_or(AuthError::SigningUnavailable)
    }

    /// Atomically replace the keys. Tokens signed with the old keys stop
    /// verifying as soon as this returns.
    pub fn rotate(&self, keys: SigningKeys) {
        let keys = Arc::new(keys);
        match self.current.write() {
            Ok(mut guard) => *guard = Some(keys),
            Err(poisoned) => *poisoned.into_inner() = Some(keys),
        }
        tracing::info!("signing keys rotated");
    }

    /// Remove the keys, e.g. when the key source becomes unavailable.
    pub fn unload(&self) {
        match self.current.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        tracing::warn!("signing keys unloaded");
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_ok_and(|guard| guard.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RS256_PRIVATE_KEY, RS256_PUBLIC_KEY, TEST_HS256_SECRET};

    #[test]
    fn test_hs256_valid() {
        let keys = SigningKeys::hs256(TEST_HS256_SECRET).expect("valid secret");
        assert_eq!(keys.algorithm(), Algorithm::HS256);
    }

    #[test]
    fn test_hs256_empty_secret() {
        assert_eq!(
            SigningKeys::hs256(&[]).map(|_| ()),
            Err(KeyError::EmptySecret)
        );
    }

    #[test]
    fn test_hs256_short_secret() {
        assert_eq!(
            SigningKeys::hs256(b"too-short").map(|_| ()),
            Err(KeyError::SecretTooShort(9))
        );
    }

    #[test]
    fn test_rs256_valid() {
        let keys = SigningKeys::from_material(&KeyMaterial::Rs256 {
            private_key_pem: RS256_PRIVATE_KEY.to_string(),
            public_key_pem: RS256_PUBLIC_KEY.to_string(),
        })
        .expect("valid key pair");
        assert_eq!(keys.algorithm(), Algorithm::RS256);
    }

    #[test]
    fn test_rs256_invalid_private_key() {
        let result = SigningKeys::from_material(&KeyMaterial::Rs256 {
            private_key_pem: "not a pem key".to_string(),
            public_key_pem: RS256_PUBLIC_KEY.to_string(),
        });
        assert!(matches!(result, Err(KeyError::InvalidRs256PrivateKey(_))));
    }

    #[test]
    fn test_rs256_invalid_public_key() {
        let result = SigningKeys::from_material(&KeyMaterial::Rs256 {
            private_key_pem: RS256_PRIVATE_KEY.to_string(),
            public_key_pem: String::new(),
        });
        assert!(matches!(result, Err(KeyError::InvalidRs256PublicKey(_))));
    }

    #[test]
    fn test_key_material_debug_hides_secret() {
        let material = KeyMaterial::Hs256 {
            secret: TEST_HS256_SECRET.to_vec(),
        };
        let rendered = format!("{material:?}");
        assert!(rendered.contains("secret_len"));
        assert!(!rendered.contains("test-secret"));
    }

    #[test]
    fn test_empty_key_ring_is_unavailable() {
        let ring = KeyRing::empty();
        assert!(!ring.is_loaded());
        assert_eq!(ring.current().map(|_| ()), Err(AuthError::SigningUnavailable));
    }

    #[test]
    fn test_rotate_and_unload() {
        let ring = KeyRing::empty();
        ring.rotate(SigningKeys::hs256(TEST_HS256_SECRET).expect("valid secret"));
        assert!(ring.is_loaded());
        assert!(ring.current().is_ok());

        ring.unload();
        assert!(!ring.is_loaded());
    }

    #[test]
    fn test_rotation_does_not_affect_held_keys() {
        let ring = KeyRing::with_keys(SigningKeys::hs256(TEST_HS256_SECRET).expect("valid secret"));
        let held = ring.current().expect("loaded");

        ring.rotate(
            SigningKeys::from_material(&KeyMaterial::Rs256 {
                private_key_pem: RS256_PRIVATE_KEY.to_string(),
                public_key_pem: RS256_PUBLIC_KEY.to_string(),
            })
            .expect("valid key pair"),
        );

        assert_eq!(held.algorithm(), Algorithm::HS256);
        assert_eq!(ring.current().expect("loaded").algorithm(), Algorithm::RS256);
    }

    #[test]
    fn test_key_error_display() {
        assert_eq!(KeyError::EmptySecret.to_string(), "HS256 secret must not be empty");
        assert_eq!(
            KeyError::SecretTooShort(4).to_string(),
            "HS256 secret must be at least 32 bytes, got 4"
        );
        assert_eq!(
            KeyError::InvalidRs256PublicKey("bad format".to_string()).to_string(),
            "invalid RS256 public key: bad format"
        );
    }
}
