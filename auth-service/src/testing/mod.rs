//! Shared test fixtures.

use std::sync::Arc;

use crate::auth::{
    AuthDependencies, AuthService, HashParams, KeyRing, SecretHasher, SigningKeys, TokenPolicy,
};
use crate::events::BroadcastEventPublisher;
use crate::revocation::InMemoryRevocationRegistry;
use crate::simulation::SimulatedClock;
use crate::store::InMemoryUserStore;
use crate::types::NewUser;

/// HS256 secret used across tests. Long enough for the key minimum.
pub const TEST_HS256_SECRET: &[u8] = b"test-secret-key-that-is-long-enough-for-hs256";

/// 2048-bit RSA private key (PKCS#1 PEM) for RS256 tests.
pub const RS256_PRIVATE_KEY: &str = include_str!("fixtures/rs256_private.pem");

/// Public half of [`RS256_PRIVATE_KEY`] (SPKI PEM).
pub const RS256_PUBLIC_KEY: &str = include_str!("fixtures/rs256_public.pem");

/// A fully wired service over in-memory collaborators and a simulated clock.
pub struct TestService {
    pub service: Arc<AuthService>,
    pub clock: Arc<SimulatedClock>,
    pub keys: Arc<KeyRing>,
    pub users: Arc<InMemoryUserStore>,
    pub revocations: Arc<InMemoryRevocationRegistry>,
    pub events: Arc<BroadcastEventPublisher>,
}

/// Build a [`TestService`] with cheap hashing and the given token policy.
pub fn test_service_with(policy: TokenPolicy) -> TestService {
    let clock = Arc::new(SimulatedClock::default_start());
    let keys = Arc::new(KeyRing::with_keys(
        SigningKeys::hs256(TEST_HS256_SECRET).expect("test key is valid"),
    ));
    let users = Arc::new(InMemoryUserStore::new());
    let revocations = Arc::new(InMemoryRevocationRegistry::new());
    let events = Arc::new(BroadcastEventPublisher::default());
    let hasher = SecretHasher::new(HashParams::MINIMAL).expect("minimal params are valid");

    let service = Arc::new(AuthService::new(AuthDependencies {
        users: users.clone(),
        revocations: revocations.clone(),
        events: events.clone(),
        clock: clock.clone(),
        keys: keys.clone(),
        hasher,
        policy,
    }));

    TestService {
        service,
        clock,
        keys,
        users,
        revocations,
        events,
    }
}

/// Build a [`TestService`] with the default token policy.
pub fn test_service() -> TestService {
    test_service_with(TokenPolicy::default())
}

/// Registration input for a user with the `user` role.
pub fn new_user(username: &str, secret: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        secret: secret.to_string(),
        roles: Vec::new(),
        bucket_id: None,
    }
}
