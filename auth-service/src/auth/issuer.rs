//! Token issuance.
//!
//! Mints signed, time-bounded access and refresh tokens.
//!
//! # Pre-conditions
//! - Signing keys must be loaded in the key ring at call time.
//!
//! # Post-conditions
//! - Every issued token carries a fresh random token ID.
//! - `expires_at > issued_at` for every issued token.
//!
//! # Invariants
//! - Issuance has no state beyond the key ring and the clock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Header, encode};

use super::claims::{TokenClaims, TokenType};
use super::keys::KeyRing;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::types::{RoleSet, TokenId, UserId};

/// Lifetimes and issuer name applied to every token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Value of the `iss` claim.
    pub issuer: String,
}

impl TokenPolicy {
    pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
    pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    pub const DEFAULT_ISSUER: &'static str = "auth-service";

    /// Lifetime of a token of the given type, in whole seconds (at least 1).
    #[must_use]
    pub fn ttl_secs(&self, token_type: TokenType) -> u64 {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        ttl.as_secs().max(1)
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Self::DEFAULT_ACCESS_TTL,
            refresh_ttl: Self::DEFAULT_REFRESH_TTL,
            issuer: Self::DEFAULT_ISSUER.to_string(),
        }
    }
}

/// A freshly minted token and the facts needed to revoke it later.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The encoded token handed to the client.
    pub token: String,
    pub token_id: TokenId,
    pub token_type: TokenType,
    pub subject: UserId,
    /// Seconds since the Unix epoch.
    pub issued_at: u64,
    /// Seconds since the Unix epoch.
    pub expires_at: u64,
}

impl IssuedToken {
    /// Expiry in milliseconds, the unit the revocation registry uses.
    #[must_use]
    pub const fn expires_at_ms(&self) -> u64 {
        self.expires_at.saturating_mul(1000)
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token_id", &self.token_id)
            .field("token_type", &self.token_type)
            .field("subject", &self.subject)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// An access token and a refresh token issued together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Mints signed tokens.
pub struct TokenIssuer {
    keys: Arc<KeyRing>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(keys: Arc<KeyRing>, clock: Arc<dyn Clock>, policy: TokenPolicy) -> Self {
        Self {
            keys,
            clock,
            policy,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Issue one token for `subject` carrying `roles`.
    ///
    /// # Errors
    /// Returns `AuthError::SigningUnavailable` if no keys are loaded or
    /// signing fails.
    pub fn issue(
        &self,
        subject: UserId,
        roles: &RoleSet,
        token_type: TokenType,
    ) -> Result<IssuedToken, AuthError> {
        let issued_at = self.clock.now_secs();
        self.issue_at(subject, roles, token_type, issued_at)
    }

    /// Issue an access and a refresh token sharing the same issue instant.
    ///
    /// # Errors
    /// Returns `AuthError::SigningUnavailable` if no keys are loaded.
    pub fn issue_pair(&self, subject: UserId, roles: &RoleSet) -> Result<TokenPair, AuthError> {
        let issued_at = self.clock.now_secs();
        Ok(TokenPair {
            access: self.issue_at(subject, roles, TokenType::Access, issued_at)?,
            refresh: self.issue_at(subject, roles, TokenType::Refresh, issued_at)?,
        })
    }

    fn issue_at(
        &self,
        subject: UserId,
        roles: &RoleSet,
        token_type: TokenType,
        issued_at: u64,
    ) -> Result<IssuedToken, AuthError> {
        let keys = self.keys.current()?;
        let token_id = TokenId::generate();
        let expires_at = issued_at.saturating_add(self.policy.ttl_secs(token_type));
        debug_assert!(expires_at > issued_at, "token must expire after issue");

        let claims = TokenClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            iat: issued_at,
            exp: expires_at,
            jti: token_id.to_string(),
            token_type,
            iss: self.policy.issuer.clone(),
        };

        let token = encode(&Header::new(keys.algorithm()), &claims, keys.encoding_key())
            .map_err(|e| {
                tracing::error!("failed to sign {token_type} token: {e}");
                AuthError::SigningUnavailable
            })?;

        tracing::debug!(
            subject = %subject,
            token_id = %token_id,
            %token_type,
            expires_at,
            "issued token"
        );

        Ok(IssuedToken {
            token,
            token_id,
            token_type,
            subject,
            issued_at,
            expires_at,
        })
    }
}
