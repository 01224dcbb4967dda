//! Authentication core.
//!
//! Credential verification, token issuance and token validation, plus the
//! [`AuthService`] facade that wires them to the user store, the revocation
//! registry and the event publisher.
//!
//! # Pre-conditions
//! - Signing keys are loaded into the [`KeyRing`] before the first login.
//!
//! # Post-conditions
//! - Every failure is a typed [`AuthError`](crate::error::AuthError).
//!
//! # Invariants
//! - Plaintext secrets, stored hashes and encoded tokens are never logged.

mod claims;
mod issuer;
mod keys;
mod password;
mod service;
mod validator;
mod verifier;

pub use claims::{TokenClaims, TokenType};
pub use issuer::{IssuedToken, TokenIssuer, TokenPair, TokenPolicy};
pub use keys::{KeyError, KeyMaterial, KeyRing, MIN_HS256_SECRET_LEN, SigningKeys};
pub use password::{HashError, HashParams, SecretHasher};
pub use service::{AuthDependencies, AuthService, DEFAULT_ROLE, MIN_SECRET_LEN};
pub use validator::{TokenValidator, VerifiedToken};
pub use verifier::{CredentialVerifier, VerifiedIdentity, check_status};
