//! Authentication events.
//!
//! The core reports what happened through an [`EventPublisher`]; where the
//! events go (logs, an in-process channel, a message bus) is the publisher's
//! concern. Events never carry secrets, hashes or raw tokens.

use tokio::sync::broadcast;

use crate::auth::TokenType;
use crate::types::{TokenId, UserId};

/// Something that happened in the authentication flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    UserRegistered {
        user_id: UserId,
        username: String,
    },
    LoginSucceeded {
        user_id: UserId,
    },
    LoginFailed {
        /// The identifier as presented (may not match any user).
        identifier: String,
        /// Internal failure label, see `AuthError::kind`.
        reason: &'static str,
    },
    TokensIssued {
        user_id: UserId,
        access_token_id: TokenId,
        refresh_token_id: TokenId,
    },
    TokensRefreshed {
        user_id: UserId,
        /// The single-use refresh token that was just consumed.
        replaced_token_id: TokenId,
    },
    TokenRevoked {
        user_id: UserId,
        token_id: TokenId,
        token_type: TokenType,
    },
}

impl AuthEvent {
    /// Stable event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "user_registered",
            Self::LoginSucceeded { .. } => "login_succeeded",
            Self::LoginFailed { .. } => "login_failed",
            Self::TokensIssued { .. } => "tokens_issued",
            Self::TokensRefreshed { .. } => "tokens_refreshed",
            Self::TokenRevoked { .. } => "token_revoked",
        }
    }
}

/// Sink for authentication events. Publishing is fire-and-forget.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: AuthEvent);
}

/// Writes every event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: AuthEvent) {
        match &event {
            AuthEvent::LoginFailed { identifier, reason } => {
                tracing::warn!(event = event.name(), identifier, reason, "auth event");
            }
            AuthEvent::UserRegistered { user_id, username } => {
                tracing::info!(event = event.name(), %user_id, username, "auth event");
            }
            AuthEvent::LoginSucceeded { user_id } => {
                tracing::info!(event = event.name(), %user_id, "auth event");
            }
            AuthEvent::TokensIssued {
                user_id,
                access_token_id,
                refresh_token_id,
            } => {
                tracing::info!(
                    event = event.name(),
                    %user_id,
                    %access_token_id,
                    %refresh_token_id,
                    "auth event"
                );
            }
            AuthEvent::TokensRefreshed {
                user_id,
                replaced_token_id,
            } => {
                tracing::info!(event = event.name(), %user_id, %replaced_token_id, "auth event");
            }
            AuthEvent::TokenRevoked {
                user_id,
                token_id,
                token_type,
            } => {
                tracing::info!(event = event.name(), %user_id, %token_id, %token_type, "auth event");
            }
        }
    }
}

/// Fans events out to in-process subscribers over a broadcast channel.
///
/// Publishing with no subscribers is not an error; a lagging subscriber
/// loses the oldest events.
#[derive(Debug)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<AuthEvent>,
}

impl BroadcastEventPublisher {
    /// Default channel capacity.
    pub const DEFAULT_CAPACITY: usize = 1024;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: AuthEvent) {
        // Err only means nobody is listening right now.
        let _ = self.sender.send(event);
    }
}
