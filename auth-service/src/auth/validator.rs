//! Token validation.
//!
//! # Pre-conditions
//! - The key ring holds the keys the token was signed with.
//!
//! # Post-conditions
//! - On success, returns the subject, roles, token ID and remaining lifetime.
//! - On failure, returns exactly one `AuthError` describing the first failed check.
//!
//! # Invariants
//! - Validation reads the clock, the key ring and the revocation registry and
//!   changes none of them.
//! - Checks run in a fixed order: structure and signature, issuer, claim
//!   encoding, expiry, revocation.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Validation, decode};

use super::claims::{TokenClaims, TokenType};
use super::keys::KeyRing;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::revocation::RevocationStore;
use crate::types::{RoleSet, TokenId, UserId};

/// Identity carried by a token that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: UserId,
    pub roles: RoleSet,
    pub token_id: TokenId,
    pub token_type: TokenType,
    /// Seconds since the Unix epoch.
    pub expires_at: u64,
    /// Time left until `expires_at`, measured against the injected clock.
    pub remaining: Duration,
}

impl VerifiedToken {
    /// Expiry in milliseconds, the unit the revocation registry uses.
    #[must_use]
    pub const fn expires_at_ms(&self) -> u64 {
        self.expires_at.saturating_mul(1000)
    }
}

/// Verifies signature, issuer, expiry and revocation status of tokens.
pub struct TokenValidator {
    keys: Arc<KeyRing>,
    clock: Arc<dyn Clock>,
    revocations: Arc<dyn RevocationStore>,
    issuer: String,
}

impl TokenValidator {
    #[must_use]
    pub fn new(
        keys: Arc<KeyRing>,
        clock: Arc<dyn Clock>,
        revocations: Arc<dyn RevocationStore>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            clock,
            revocations,
            issuer: issuer.into(),
        }
    }

    /// Validate a token of either type.
    ///
    /// # Errors
    /// - `MalformedToken` if the token is not a well-formed signed token.
    /// - `BadSignature` if the signature does not verify with the current key.
    /// - `InvalidIssuer` if the `iss` claim is not ours.
    /// - `Expired` if the clock is at or past `exp`.
    /// - `Revoked` if the token ID is in the revocation registry.
    /// - `SigningUnavailable` / `StoreUnavailable` if a dependency is missing or failing.
    pub fn validate(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let claims = self.decode_claims(token)?;

        let subject: UserId = claims.sub.parse().map_err(|_| AuthError::MalformedToken)?;
        let token_id: TokenId = claims.jti.parse().map_err(|_| AuthError::MalformedToken)?;
        let roles = RoleSet::try_from_iter(&claims.roles).map_err(|_| AuthError::MalformedToken)?;
        if claims.exp <= claims.iat {
            return Err(AuthError::MalformedToken);
        }

        let now_ms = self.clock.now_ms();
        let expires_at_ms = claims.exp.saturating_mul(1000);
        if now_ms >= expires_at_ms {
            return Err(AuthError::Expired);
        }

        let revoked = self.revocations.is_revoked(&token_id).map_err(|e| {
            tracing::warn!(%token_id, "revocation lookup failed: {e}");
            AuthError::from(e)
        })?;
        if revoked {
            return Err(AuthError::Revoked);
        }

        Ok(VerifiedToken {
            subject,
            roles,
            token_id,
            token_type: claims.token_type,
            expires_at: claims.exp,
            remaining: Duration::from_millis(expires_at_ms - now_ms),
        })
    }

    /// Validate a token and require it to be of `expected` type.
    ///
    /// # Errors
    /// Everything [`validate`](Self::validate) returns, plus
    /// `TokenTypeMismatch` when the token is of the other type.
    pub fn validate_as(&self, token: &str, expected: TokenType) -> Result<VerifiedToken, AuthError> {
        let verified = self.validate(token)?;
        if verified.token_type != expected {
            return Err(AuthError::TokenTypeMismatch);
        }
        Ok(verified)
    }

    fn decode_claims(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let keys = self.keys.current()?;

        let mut validation = Validation::new(keys.algorithm());
        // Expiry is checked against the injected clock, not the OS clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<TokenClaims>(token, keys.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }
}

/// Maps jsonwebtoken errors to our `AuthError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        // A token signed for another algorithm cannot have been signed by our key.
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::BadSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::MalformedToken,
    }
}
