//! ID types for users and tokens.
//!
//! Both identifiers are 128-bit values rendered as 32 lowercase hex
//! characters on the wire and in logs.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Serialize, Serializer};

/// Length of an ID in bytes.
pub const ID_LEN: usize = 16;

/// Error returned when parsing a hex-encoded ID fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    /// The input is not exactly 32 characters long.
    WrongLength(usize),
    /// The input contains a character outside `[0-9a-fA-F]`.
    InvalidCharacter(char),
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongLength(len) => {
                write!(f, "expected {} hex characters, got {len}", ID_LEN * 2)
            }
            Self::InvalidCharacter(c) => write!(f, "invalid hex character: {c:?}"),
        }
    }
}

impl std::error::Error for IdParseError {}

fn encode_hex(bytes: &[u8; ID_LEN], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

fn decode_hex(s: &str) -> Result<[u8; ID_LEN], IdParseError> {
    if s.len() != ID_LEN * 2 {
        return Err(IdParseError::WrongLength(s.len()));
    }

    let nibble = |c: char| {
        c.to_digit(16)
            .and_then(|d| u8::try_from(d).ok())
            .ok_or(IdParseError::InvalidCharacter(c))
    };

    let mut bytes = [0u8; ID_LEN];
    let mut chars = s.chars();
    for byte in &mut bytes {
        // Length was checked above, so both characters exist for ASCII input;
        // non-ASCII input fails the digit check.
        let hi = chars.next().map_or(Err(IdParseError::WrongLength(s.len())), nibble)?;
        let lo = chars.next().map_or(Err(IdParseError::WrongLength(s.len())), nibble)?;
        *byte = (hi << 4) | lo;
    }
    Ok(bytes)
}

/// Opaque identity of a user record.
///
/// # Invariants
///
/// - The ID is exactly 16 bytes.
/// - The ID never changes for the lifetime of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub [u8; ID_LEN]);

impl UserId {
    /// Generate a fresh random user ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::rng().random())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        encode_hex(&self.0, f)
    }
}

impl FromStr for UserId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Unique identifier of an issued token, used as the revocation key.
///
/// 128 random bits, so collisions are negligible without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub [u8; ID_LEN]);

impl TokenId {
    /// Generate a fresh random token ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(rand::rng().random())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        encode_hex(&self.0, f)
    }
}

impl FromStr for TokenId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Self)
    }
}

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
