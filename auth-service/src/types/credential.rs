//! Presented login credentials.

use std::fmt;

/// An (identifier, plaintext secret) pair as presented at login.
///
/// Lives only for the duration of a verification; it is never stored and its
/// `Debug` output never shows the secret.
#[derive(Clone)]
pub struct Credential {
    /// Username or email.
    pub identifier: String,
    pub secret: String,
}

impl Credential {
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}
