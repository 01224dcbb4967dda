//! Invariant checking for deterministic simulation testing.
//!
//! The simulator records what it was handed (tokens, revocations) in an
//! [`OperationHistory`] and asks the [`InvariantChecker`] whether each
//! observed outcome is allowed by that history.

use std::collections::HashMap;
use std::fmt;

use crate::auth::{TokenPair, TokenType, VerifiedToken};
use crate::error::AuthError;
use crate::types::{TokenId, UserId};

/// What the model knows about an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub subject: UserId,
    pub token_type: TokenType,
    pub expires_at_ms: u64,
    /// The service confirmed a revocation of this token.
    pub revoked: bool,
    /// A revocation was attempted but its outcome is unknown.
    pub maybe_revoked: bool,
}

/// Tracks the tokens seen during a simulation run.
#[derive(Debug, Default)]
pub struct OperationHistory {
    tokens: HashMap<TokenId, TokenRecord>,
}

impl OperationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly issued token.
    pub fn record_issued(
        &mut self,
        token_id: TokenId,
        subject: UserId,
        token_type: TokenType,
        expires_at_ms: u64,
    ) {
        self.tokens.insert(
            token_id,
            TokenRecord {
                subject,
                token_type,
                expires_at_ms,
                revoked: false,
                maybe_revoked: false,
            },
        );
    }

    /// Record a confirmed revocation.
    pub fn record_revoked(&mut self, token_id: &TokenId) {
        if let Some(record) = self.tokens.get_mut(token_id) {
            record.revoked = true;
        }
    }

    /// Record a revocation attempt whose outcome is unknown.
    pub fn record_maybe_revoked(&mut self, token_id: &TokenId) {
        if let Some(record) = self.tokens.get_mut(token_id) {
            record.maybe_revoked = true;
        }
    }

    #[must_use]
    pub fn get(&self, token_id: &TokenId) -> Option<&TokenRecord> {
        self.tokens.get(token_id)
    }

    /// Number of confirmed-revoked tokens that have not expired at `now_ms`.
    #[must_use]
    pub fn live_revocations(&self, now_ms: u64) -> usize {
        self.tokens
            .values()
            .filter(|t| t.revoked && t.expires_at_ms >= now_ms)
            .count()
    }

    /// Number of revoked or possibly revoked tokens that have not expired at `now_ms`.
    #[must_use]
    pub fn possible_revocations(&self, now_ms: u64) -> usize {
        self.tokens
            .values()
            .filter(|t| (t.revoked || t.maybe_revoked) && t.expires_at_ms >= now_ms)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Operation index at which the violation was detected.
    pub operation: u64,
    pub description: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation {}: {}", self.operation, self.description)
    }
}

/// Checks observed outcomes against the history.
#[derive(Debug, Default)]
pub struct InvariantChecker {
    violations: Vec<InvariantViolation>,
}

impl InvariantChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation found outside the checks below.
    pub fn record(&mut self, operation: u64, description: String) {
        self.violations.push(InvariantViolation {
            operation,
            description,
        });
    }

    /// A validation outcome for a token the simulator holds.
    ///
    /// - A success must match the issued subject and type, must not be
    ///   expired and must not be confirmed revoked.
    /// - A live, unrevoked token may only fail because a store is down.
    pub fn check_validation(
        &mut self,
        operation: u64,
        history: &OperationHistory,
        token_id: &TokenId,
        now_ms: u64,
        result: &Result<VerifiedToken, AuthError>,
    ) {
        if let (Ok(verified), Some(record)) = (result, history.get(token_id))
            && verified.token_type != record.token_type
        {
            self.record(operation, format!("token {token_id} changed type"));
        }
        let outcome = result.as_ref().map(|verified| verified.subject);
        self.check_token_use(operation, history, token_id, now_ms, outcome);
    }

    /// A refresh outcome for a refresh token the simulator holds.
    ///
    /// Same rules as [`Self::check_validation`]; in particular a refresh
    /// token that was already exchanged never refreshes again.
    pub fn check_refresh(
        &mut self,
        operation: u64,
        history: &OperationHistory,
        token_id: &TokenId,
        now_ms: u64,
        result: &Result<TokenPair, AuthError>,
    ) {
        let outcome = result.as_ref().map(|pair| pair.access.subject);
        self.check_token_use(operation, history, token_id, now_ms, outcome);
    }

    fn check_token_use(
        &mut self,
        operation: u64,
        history: &OperationHistory,
        token_id: &TokenId,
        now_ms: u64,
        outcome: Result<UserId, &AuthError>,
    ) {
        let Some(record) = history.get(token_id) else {
            self.record(operation, format!("used unknown token {token_id}"));
            return;
        };
        let expired = now_ms >= record.expires_at_ms;

        match outcome {
            Ok(subject) => {
                if subject != record.subject {
                    self.record(
                        operation,
                        format!(
                            "token {token_id} accepted for {subject} but was issued to {}",
                            record.subject
                        ),
                    );
                }
                if expired {
                    self.record(operation, format!("expired token {token_id} accepted"));
                }
                if record.revoked {
                    self.record(operation, format!("revoked token {token_id} accepted"));
                }
            }
            Err(AuthError::Expired) if !expired => {
                self.record(operation, format!("live token {token_id} reported expired"));
            }
            Err(AuthError::Revoked) if !record.revoked && !record.maybe_revoked => {
                self.record(
                    operation,
                    format!("token {token_id} reported revoked but never was"),
                );
            }
            Err(
                AuthError::Expired
                | AuthError::Revoked
                | AuthError::StoreUnavailable(_)
                | AuthError::TokenTypeMismatch,
            ) => {}
            Err(other) => {
                self.record(
                    operation,
                    format!("genuine token {token_id} failed with {other:?}"),
                );
            }
        }
    }

    /// A tampered token must never validate.
    pub fn check_tampered(
        &mut self,
        operation: u64,
        result: &Result<VerifiedToken, AuthError>,
    ) {
        match result {
            Err(AuthError::BadSignature | AuthError::MalformedToken) => {}
            other => self.record(
                operation,
                format!("tampered token produced {other:?}"),
            ),
        }
    }

    /// A logout outcome for an access token the simulator holds.
    pub fn check_logout(
        &mut self,
        operation: u64,
        history: &OperationHistory,
        token_id: &TokenId,
        now_ms: u64,
        result: &Result<(), AuthError>,
    ) {
        let outcome = match (result, history.get(token_id)) {
            (Ok(()), Some(record)) => Ok(record.subject),
            (Ok(()), None) => {
                self.record(operation, format!("logged out with unknown token {token_id}"));
                return;
            }
            (Err(e), _) => Err(e),
        };
        self.check_token_use(operation, history, token_id, now_ms, outcome);
    }

    /// A login outcome for an existing user.
    ///
    /// The right secret succeeds or fails only because a store is down;
    /// a wrong secret is `BadCredentials` or store failure. `NotFound` is
    /// never acceptable for an existing user, and issued tokens name them.
    pub fn check_login(
        &mut self,
        operation: u64,
        correct_secret: bool,
        expected_subject: &UserId,
        result: &Result<TokenPair, AuthError>,
    ) {
        match (correct_secret, result) {
            (true, Ok(pair)) => {
                if pair.access.subject != *expected_subject
                    || pair.refresh.subject != *expected_subject
                {
                    self.record(
                        operation,
                        format!("login for {expected_subject} issued tokens for another subject"),
                    );
                }
            }
            (_, Err(AuthError::StoreUnavailable(_))) | (false, Err(AuthError::BadCredentials)) => {}
            (false, Ok(_)) => self.record(operation, "wrong secret logged in".to_string()),
            (_, Err(e)) => self.record(
                operation,
                format!("login for existing user failed with {e:?}"),
            ),
        }
    }

    /// Registry size stays within what the history allows.
    pub fn check_registry_size(
        &mut self,
        operation: u64,
        history: &OperationHistory,
        now_ms: u64,
        registry_len: usize,
    ) {
        let min = history.live_revocations(now_ms);
        let max = history.possible_revocations(now_ms);
        if registry_len < min || registry_len > max {
            self.record(
                operation,
                format!("registry holds {registry_len} entries after prune, expected {min}..={max}"),
            );
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }
}
