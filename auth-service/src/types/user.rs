//! User records, registration input and the public user projection.
//!
//! # Invariants
//! - A `UserRecord` is a snapshot; changing it never changes the store.
//! - The password hash never appears in `Debug` output or in a `UserProfile`.

use std::fmt;

use serde::Serialize;

use super::{RoleError, RoleSet, UserId};

/// Account-status flags checked on every login.
///
/// All flags default to `true` (a usable account).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    /// Soft-delete switch; records are disabled, never removed.
    pub enabled: bool,
    pub account_non_expired: bool,
    pub account_non_locked: bool,
    pub credentials_non_expired: bool,
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self {
            enabled: true,
            account_non_expired: true,
            account_non_locked: true,
            credentials_non_expired: true,
        }
    }
}

impl AccountStatus {
    /// Status of a soft-deleted account.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Status of a locked account.
    #[must_use]
    pub fn locked() -> Self {
        Self {
            account_non_locked: false,
            ..Self::default()
        }
    }
}

/// A persisted user.
///
/// Timestamps are milliseconds since the Unix epoch and are always supplied
/// explicitly by the caller; nothing is populated implicitly on save.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    password_hash: String,
    pub roles: RoleSet,
    /// Storage bucket assigned to the user, if any.
    pub bucket_id: Option<String>,
    pub status: AccountStatus,
    pub created_at: u64,
    pub updated_at: u64,
    pub last_login_at: Option<u64>,
}

impl UserRecord {
    /// Create a new record with default status and no login yet.
    ///
    /// # Pre-conditions
    /// - `password_hash` is a PHC string produced by the secret hasher.
    #[must_use]
    pub const fn new(
        id: UserId,
        username: String,
        email: String,
        password_hash: String,
        roles: RoleSet,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            username,
            email,
            password_hash,
            roles,
            bucket_id: None,
            status: AccountStatus {
                enabled: true,
                account_non_expired: true,
                account_non_locked: true,
                credentials_non_expired: true,
            },
            created_at: now_ms,
            updated_at: now_ms,
            last_login_at: None,
        }
    }

    /// The stored salted hash. Only the credential verifier should read this.
    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("roles", &self.roles)
            .field("bucket_id", &self.bucket_id)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("last_login_at", &self.last_login_at)
            .finish()
    }
}

/// Error returned when registration input is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The username is empty after trimming.
    EmptyUsername,
    /// Usernames may not contain `@`, so they never collide with emails.
    UsernameContainsAt,
    /// The email is not of the form `local@domain`.
    InvalidEmail,
    /// The secret is shorter than the configured minimum.
    SecretTooShort { min: usize },
    /// A requested role is invalid.
    Role(RoleError),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::UsernameContainsAt => write!(f, "username must not contain '@'"),
            Self::InvalidEmail => write!(f, "email is not valid"),
            Self::SecretTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::Role(e) => write!(f, "invalid role: {e}"),
        }
    }
}

impl std::error::Error for RegistrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Role(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RoleError> for RegistrationError {
    fn from(e: RoleError) -> Self {
        Self::Role(e)
    }
}

/// Registration input. The secret is plaintext and must never be logged.
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub secret: String,
    pub roles: Vec<String>,
    pub bucket_id: Option<String>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .field("roles", &self.roles)
            .field("bucket_id", &self.bucket_id)
            .finish()
    }
}

/// Registration input after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUser {
    pub username: String,
    pub email: String,
    pub roles: RoleSet,
    pub bucket_id: Option<String>,
}

impl NewUser {
    /// Validate and normalize the input.
    ///
    /// `default_role` is applied when no roles were requested.
    ///
    /// # Errors
    /// Returns the first `RegistrationError` found.
    pub fn validate(
        &self,
        min_secret_len: usize,
        default_role: &str,
    ) -> Result<ValidatedUser, RegistrationError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(RegistrationError::EmptyUsername);
        }
        if username.contains('@') {
            return Err(RegistrationError::UsernameContainsAt);
        }

        let email = self.email.trim();
        if !is_plausible_email(email) {
            return Err(RegistrationError::InvalidEmail);
        }

        if self.secret.chars().count() < min_secret_len {
            return Err(RegistrationError::SecretTooShort {
                min: min_secret_len,
            });
        }

        let roles = if self.roles.is_empty() {
            RoleSet::try_from_iter([default_role])?
        } else {
            RoleSet::try_from_iter(&self.roles)?
        };

        Ok(ValidatedUser {
            username: username.to_string(),
            email: email.to_string(),
            roles,
            bucket_id: self
                .bucket_id
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_string),
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        _ => false,
    }
}

/// Public projection of a user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub roles: RoleSet,
    pub bucket_id: Option<String>,
    pub created_at: u64,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            bucket_id: user.bucket_id.clone(),
            created_at: user.created_at,
        }
    }
}
