//! Error taxonomy for the authentication core.
//!
//! Every failure is a typed variant. Variants stay distinct internally so
//! logs and events can tell them apart, while [`AuthError::public_message`]
//! collapses them into messages that leak nothing about which check failed.

use std::fmt;

use crate::types::RegistrationError;

/// Errors surfaced by the external collaborators (user store, revocation store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or failed the operation.
    Unavailable(String),
    /// A unique index (username or email) already holds the value.
    Conflict { field: &'static str },
    /// A mutation targeted a user id that does not exist.
    UserNotFound,
    /// The mutation itself was invalid (for example an empty role).
    InvalidInput(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
            Self::Conflict { field } => write!(f, "{field} is already taken"),
            Self::UserNotFound => write!(f, "user not found"),
            Self::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Failures of credential verification, token issuance and token validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No user matches the identifier.
    NotFound,
    AccountDisabled,
    AccountLocked,
    AccountExpired,
    CredentialsExpired,
    /// The secret does not match the stored hash.
    BadCredentials,
    /// The token is not a structurally valid signed token.
    MalformedToken,
    BadSignature,
    Expired,
    Revoked,
    /// A valid token of the wrong kind (access vs refresh) was presented.
    TokenTypeMismatch,
    /// The token was issued by a different issuer.
    InvalidIssuer,
    /// No signing key is loaded.
    SigningUnavailable,
    /// A store lookup failed. The only retryable failure.
    StoreUnavailable(String),
    /// Registration conflicts with an existing username or email.
    UserExists,
    /// Registration input was rejected.
    InvalidRegistration(RegistrationError),
    /// A store rejected a mutation as invalid; retrying will not help.
    InvalidInput(String),
}

/// Coarse grouping used to pick an externally visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Credentials,
    Token,
    Unavailable,
    Conflict,
    InvalidRequest,
}

impl AuthError {
    /// The externally visible class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound
            | Self::AccountDisabled
            | Self::AccountLocked
            | Self::AccountExpired
            | Self::CredentialsExpired
            | Self::BadCredentials => ErrorClass::Credentials,
            Self::MalformedToken
            | Self::BadSignature
            | Self::Expired
            | Self::Revoked
            | Self::TokenTypeMismatch
            | Self::InvalidIssuer => ErrorClass::Token,
            Self::SigningUnavailable | Self::StoreUnavailable(_) => ErrorClass::Unavailable,
            Self::UserExists => ErrorClass::Conflict,
            Self::InvalidRegistration(_) | Self::InvalidInput(_) => ErrorClass::InvalidRequest,
        }
    }

    /// Message safe to return to a client.
    ///
    /// Never distinguishes a wrong password from an unknown user, nor a bad
    /// signature from an expired or revoked token.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self.class() {
            ErrorClass::Credentials => "invalid credentials",
            ErrorClass::Token => "invalid token",
            ErrorClass::Unavailable => "service unavailable",
            ErrorClass::Conflict => "account already exists",
            ErrorClass::InvalidRequest => "invalid request",
        }
    }

    /// Stable label for logs and events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AccountDisabled => "account_disabled",
            Self::AccountLocked => "account_locked",
            Self::AccountExpired => "account_expired",
            Self::CredentialsExpired => "credentials_expired",
            Self::BadCredentials => "bad_credentials",
            Self::MalformedToken => "malformed_token",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::TokenTypeMismatch => "token_type_mismatch",
            Self::InvalidIssuer => "invalid_issuer",
            Self::SigningUnavailable => "signing_unavailable",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::UserExists => "user_exists",
            Self::InvalidRegistration(_) => "invalid_registration",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// Whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "user not found"),
            Self::AccountDisabled => write!(f, "account is disabled"),
            Self::AccountLocked => write!(f, "account is locked"),
            Self::AccountExpired => write!(f, "account has expired"),
            Self::CredentialsExpired => write!(f, "credentials have expired"),
            Self::BadCredentials => write!(f, "bad credentials"),
            Self::MalformedToken => write!(f, "malformed token"),
            Self::BadSignature => write!(f, "invalid token signature"),
            Self::Expired => write!(f, "token has expired"),
            Self::Revoked => write!(f, "token has been revoked"),
            Self::TokenTypeMismatch => write!(f, "wrong token type"),
            Self::InvalidIssuer => write!(f, "token issuer mismatch"),
            Self::SigningUnavailable => write!(f, "signing key unavailable"),
            Self::StoreUnavailable(reason) => write!(f, "store unavailable: {reason}"),
            Self::UserExists => write!(f, "username or email already registered"),
            Self::InvalidRegistration(e) => write!(f, "invalid registration: {e}"),
            Self::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegistration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
            StoreError::Conflict { .. } => Self::UserExists,
            StoreError::UserNotFound => Self::NotFound,
            StoreError::InvalidInput(reason) => Self::InvalidInput(reason),
        }
    }
}

impl From<RegistrationError> for AuthError {
    fn from(e: RegistrationError) -> Self {
        Self::InvalidRegistration(e)
    }
}
