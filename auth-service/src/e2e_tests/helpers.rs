//! Common helpers for end-to-end tests.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{
    AuthDependencies, AuthService, HashParams, KeyRing, SecretHasher, SigningKeys, TokenPair,
    TokenPolicy,
};
use crate::events::TracingEventPublisher;
use crate::revocation::InMemoryRevocationRegistry;
use crate::simulation::{FaultConfig, FaultyRevocationStore, FaultyUserStore, SimulatedClock};
use crate::store::InMemoryUserStore;
use crate::testing::{TEST_HS256_SECRET, TestService, new_user, test_service_with};
use crate::types::{Credential, UserProfile};

pub use crate::error::AuthError;
pub use crate::testing::{RS256_PRIVATE_KEY, RS256_PUBLIC_KEY};

/// Policy with a five-minute access token and a one-hour refresh token.
pub fn short_policy() -> TokenPolicy {
    TokenPolicy {
        access_ttl: Duration::from_secs(5 * 60),
        refresh_ttl: Duration::from_secs(60 * 60),
        ..TokenPolicy::default()
    }
}

/// A service with the short policy.
pub fn service() -> TestService {
    test_service_with(short_policy())
}

/// Register `username` and return their profile.
pub fn register(t: &TestService, username: &str, secret: &str) -> UserProfile {
    t.service
        .register(&new_user(username, secret))
        .expect("registration should succeed")
}

/// Log in and return the issued pair.
pub fn login(t: &TestService, identifier: &str, secret: &str) -> TokenPair {
    t.service
        .login(&Credential::new(identifier, secret))
        .expect("login should succeed")
}

/// Advance the simulated clock.
pub fn advance(t: &TestService, by: Duration) {
    let ms = u64::try_from(by.as_millis()).expect("duration fits in u64");
    t.clock.advance(ms);
}

/// A service whose stores fail according to `faults`, plus the unfaulted
/// stores behind the wrappers.
pub struct FaultyService {
    pub service: AuthService,
    pub users: Arc<InMemoryUserStore>,
    pub revocations: Arc<InMemoryRevocationRegistry>,
}

pub fn faulty_service(faults: FaultConfig) -> FaultyService {
    let clock = Arc::new(SimulatedClock::default_start());
    let users = Arc::new(InMemoryUserStore::new());
    let revocations = Arc::new(InMemoryRevocationRegistry::new());

    let service = AuthService::new(AuthDependencies {
        users: Arc::new(FaultyUserStore::new(users.clone(), 1, faults)),
        revocations: Arc::new(FaultyRevocationStore::new(revocations.clone(), 2, faults)),
        events: Arc::new(TracingEventPublisher),
        clock,
        keys: Arc::new(KeyRing::with_keys(
            SigningKeys::hs256(TEST_HS256_SECRET).expect("test key is valid"),
        )),
        hasher: SecretHasher::new(HashParams::MINIMAL).expect("minimal params are valid"),
        policy: short_policy(),
    });

    FaultyService {
        service,
        users,
        revocations,
    }
}
