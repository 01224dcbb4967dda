//! Token payload.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which half of a token pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token presented on every request.
    Access,
    /// Long-lived, single-use token exchanged for a new pair.
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims carried in every token.
///
/// `sub` and `jti` are 32-char hex IDs; `iat` and `exp` are seconds since
/// the Unix epoch.
///
/// # Invariants
/// - `exp > iat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user the token represents.
    pub sub: String,
    pub roles: Vec<String>,
    pub iat: u64,
    pub exp: u64,
    /// Token ID, the revocation key.
    pub jti: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iss: String,
}
