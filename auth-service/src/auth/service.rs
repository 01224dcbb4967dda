//! The authentication service: registration, login, refresh, logout and
//! request authentication built from the verifier, issuer, validator and
//! revocation registry.
//!
//! # Pre-conditions
//! - Every collaborator is wired explicitly through [`AuthDependencies`].
//!
//! # Post-conditions
//! - Every flow publishes its outcome as an [`AuthEvent`].
//!
//! # Invariants
//! - A refresh token is single-use: a successful refresh revokes it.
//! - Hashing runs synchronously; async callers move these calls to a
//!   blocking thread.

use std::sync::Arc;

use super::claims::TokenType;
use super::issuer::{TokenIssuer, TokenPair, TokenPolicy};
use super::keys::KeyRing;
use super::password::SecretHasher;
use super::validator::{TokenValidator, VerifiedToken};
use super::verifier::{CredentialVerifier, check_status};
use crate::clock::Clock;
use crate::error::AuthError;
use crate::events::{AuthEvent, EventPublisher};
use crate::revocation::RevocationStore;
use crate::store::UserStore;
use crate::types::{Credential, NewUser, UserId, UserProfile, UserRecord};

/// Minimum registration secret length, in characters.
pub const MIN_SECRET_LEN: usize = 8;

/// Role given to users who register without requesting any.
pub const DEFAULT_ROLE: &str = "user";

/// Collaborators the service is built from.
pub struct AuthDependencies {
    pub users: Arc<dyn UserStore>,
    pub revocations: Arc<dyn RevocationStore>,
    pub events: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
    pub keys: Arc<KeyRing>,
    pub hasher: SecretHasher,
    pub policy: TokenPolicy,
}

/// Facade over the authentication core.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    revocations: Arc<dyn RevocationStore>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    hasher: SecretHasher,
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl AuthService {
    #[must_use]
    pub fn new(deps: AuthDependencies) -> Self {
        let verifier =
            CredentialVerifier::new(deps.users.clone(), deps.hasher.clone(), deps.clock.clone());
        let validator = TokenValidator::new(
            deps.keys.clone(),
            deps.clock.clone(),
            deps.revocations.clone(),
            deps.policy.issuer.clone(),
        );
        let issuer = TokenIssuer::new(deps.keys, deps.clock.clone(), deps.policy);

        Self {
            users: deps.users,
            revocations: deps.revocations,
            events: deps.events,
            clock: deps.clock,
            hasher: deps.hasher,
            verifier,
            issuer,
            validator,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &TokenPolicy {
        self.issuer.policy()
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - `InvalidRegistration` if the input is rejected.
    /// - `UserExists` if the username or email is taken.
    /// - `StoreUnavailable` if the store fails or hashing fails.
    pub fn register(&self, new_user: &NewUser) -> Result<UserProfile, AuthError> {
        let validated = new_user.validate(MIN_SECRET_LEN, DEFAULT_ROLE)?;

        let password_hash = self.hasher.hash(&new_user.secret).map_err(|e| {
            tracing::error!("failed to hash secret during registration: {e}");
            AuthError::StoreUnavailable("could not hash secret".to_string())
        })?;

        let mut record = UserRecord::new(
            UserId::generate(),
            validated.username,
            validated.email,
            password_hash,
            validated.roles,
            self.clock.now_ms(),
        );
        record.bucket_id = validated.bucket_id;

        let record = self.users.insert(record)?;
        self.events.publish(AuthEvent::UserRegistered {
            user_id: record.id,
            username: record.username.clone(),
        });

        Ok(UserProfile::from(&record))
    }

    /// Verify a credential and issue a token pair.
    ///
    /// # Errors
    /// Any credential failure from the verifier, or `SigningUnavailable`.
    pub fn login(&self, credential: &Credential) -> Result<TokenPair, AuthError> {
        let identity = match self.verifier.verify(credential) {
            Ok(identity) => identity,
            Err(e) => {
                self.events.publish(AuthEvent::LoginFailed {
                    identifier: credential.identifier.clone(),
                    reason: e.kind(),
                });
                return Err(e);
            }
        };

        let pair = self.issuer.issue_pair(identity.subject, &identity.roles)?;

        self.events.publish(AuthEvent::LoginSucceeded {
            user_id: identity.subject,
        });
        self.publish_issued(&pair);
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair and retire the old one.
    ///
    /// The user is reloaded so role and status changes since the last
    /// login take effect.
    ///
    /// # Errors
    /// - Any token failure, including `TokenTypeMismatch` for an access token.
    /// - `Revoked` if the same refresh token was already exchanged.
    /// - `NotFound` or an account-status failure if the user changed.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let presented = self.validator.validate_as(refresh_token, TokenType::Refresh)?;

        let user = self
            .users
            .find_by_id(&presented.subject)?
            .ok_or(AuthError::NotFound)?;
        check_status(&user)?;

        let pair = self.issuer.issue_pair(user.id, &user.roles)?;

        // Losing this race means a concurrent refresh already consumed the token.
        if !self
            .revocations
            .revoke(presented.token_id, presented.expires_at_ms())?
        {
            tracing::warn!(
                user_id = %user.id,
                token_id = %presented.token_id,
                "refresh token reused"
            );
            return Err(AuthError::Revoked);
        }

        self.events.publish(AuthEvent::TokensRefreshed {
            user_id: user.id,
            replaced_token_id: presented.token_id,
        });
        self.publish_issued(&pair);
        Ok(pair)
    }

    /// Revoke an access token and, optionally, the refresh token issued with it.
    ///
    /// A refresh token that does not validate or belongs to another subject
    /// is ignored. Both tokens are validated before anything is revoked, and
    /// the refresh token is revoked first, so a call that fails with
    /// `StoreUnavailable` can be retried with the same tokens.
    ///
    /// # Errors
    /// Any token failure for the access token, or `StoreUnavailable`.
    pub fn logout(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let access = self.validator.validate_as(access_token, TokenType::Access)?;

        let refresh = match refresh_token.map(|t| self.validator.validate_as(t, TokenType::Refresh)) {
            None => None,
            Some(Ok(refresh)) if refresh.subject == access.subject => Some(refresh),
            Some(Ok(refresh)) => {
                tracing::warn!(
                    user_id = %access.subject,
                    other_user_id = %refresh.subject,
                    "logout presented another user's refresh token"
                );
                None
            }
            Some(Err(e @ AuthError::StoreUnavailable(_))) => return Err(e),
            Some(Err(e)) => {
                tracing::debug!(user_id = %access.subject, "ignoring refresh token on logout: {e}");
                None
            }
        };

        if let Some(refresh) = &refresh {
            self.revoke(refresh)?;
        }
        self.revoke(&access)
    }

    /// Authenticate a request by its access token.
    ///
    /// # Errors
    /// Any token failure; a refresh token yields `TokenTypeMismatch`.
    pub fn authenticate(&self, access_token: &str) -> Result<VerifiedToken, AuthError> {
        self.validator.validate_as(access_token, TokenType::Access)
    }

    /// Public profile of a user.
    ///
    /// # Errors
    /// `NotFound` if the user does not exist, or `StoreUnavailable`.
    pub fn profile(&self, user_id: &UserId) -> Result<UserProfile, AuthError> {
        let user = self.users.find_by_id(user_id)?.ok_or(AuthError::NotFound)?;
        Ok(UserProfile::from(&user))
    }

    fn revoke(&self, token: &VerifiedToken) -> Result<(), AuthError> {
        self.revocations
            .revoke(token.token_id, token.expires_at_ms())?;
        self.events.publish(AuthEvent::TokenRevoked {
            user_id: token.subject,
            token_id: token.token_id,
            token_type: token.token_type,
        });
        Ok(())
    }

    fn publish_issued(&self, pair: &TokenPair) {
        self.events.publish(AuthEvent::TokensIssued {
            user_id: pair.access.subject,
            access_token_id: pair.access.token_id,
            refresh_token_id: pair.refresh.token_id,
        });
    }
}
