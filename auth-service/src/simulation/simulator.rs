//! Main simulator harness for deterministic simulation testing.
//!
//! Drives a fully wired [`AuthService`] with a seeded stream of operations
//! (register, login, authenticate, refresh, logout, tamper, prune, clock
//! advance) over fault-injecting stores and a simulated clock, checking
//! every outcome against the operation history.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::faults::{FaultConfig, FaultyRevocationStore, FaultyUserStore};
use super::invariants::{InvariantChecker, InvariantViolation, OperationHistory};
use super::time::SimulatedClock;
use crate::auth::{
    AuthDependencies, AuthService, HashParams, IssuedToken, KeyRing, SecretHasher, SigningKeys,
    TokenPair, TokenPolicy,
};
use crate::clock::Clock;
use crate::error::AuthError;
use crate::events::TracingEventPublisher;
use crate::revocation::{InMemoryRevocationRegistry, RevocationStore};
use crate::store::InMemoryUserStore;
use crate::types::{Credential, NewUser, UserId};

const SIM_HS256_SECRET: &[u8] = b"simulation-signing-secret-long-enough-for-hs256";

/// Sessions kept around for reuse; older ones are dropped first.
const MAX_SESSIONS: usize = 64;

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Fault injection configuration.
    pub fault_config: FaultConfig,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Upper bound for a single clock advance, in milliseconds.
    pub max_clock_step_ms: u64,
    /// Number of distinct users the simulation registers.
    pub max_users: usize,
}

impl SimulatorConfig {
    /// Create a new simulator config with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            fault_config: FaultConfig::default(),
            access_ttl: Duration::from_secs(5 * 60),
            refresh_ttl: Duration::from_secs(30 * 60),
            max_clock_step_ms: 60_000,
            max_users: 4,
        }
    }

    /// Set the fault configuration.
    #[must_use]
    pub const fn with_fault_config(mut self, config: FaultConfig) -> Self {
        self.fault_config = config;
        self
    }

    /// Set the token lifetimes.
    #[must_use]
    pub const fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }
}

/// Results from a simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The seed used for this simulation.
    pub seed: u64,
    /// Number of operations executed.
    pub operations: u64,
    /// Operations the service accepted.
    pub successes: u64,
    /// Operations the service rejected (expected rejections included).
    pub failures: u64,
    /// Store faults injected during the run.
    pub injected_faults: u64,
    /// Invariant violations detected.
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationResult {
    /// Check if the simulation passed (no invariant violations).
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.invariant_violations.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Register,
    Login { correct_secret: bool },
    Authenticate,
    Refresh,
    Logout { with_refresh: bool },
    AdvanceClock,
    Prune,
    Tamper,
}

struct SimUser {
    id: UserId,
    username: String,
    secret: String,
}

/// The main simulator harness.
pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    clock: Arc<SimulatedClock>,
    service: AuthService,
    users: Arc<FaultyUserStore>,
    revocations: Arc<FaultyRevocationStore>,
    registry: Arc<InMemoryRevocationRegistry>,
    history: OperationHistory,
    checker: InvariantChecker,
    known_users: Vec<SimUser>,
    sessions: Vec<TokenPair>,
    next_user: u64,
    operations: u64,
    successes: u64,
    failures: u64,
}

impl Simulator {
    /// Create a new simulator with the given configuration.
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let clock = Arc::new(SimulatedClock::default_start());
        let registry = Arc::new(InMemoryRevocationRegistry::new());
        let users = Arc::new(FaultyUserStore::new(
            Arc::new(InMemoryUserStore::new()),
            config.seed,
            config.fault_config,
        ));
        let revocations = Arc::new(FaultyRevocationStore::new(
            registry.clone(),
            config.seed.rotate_left(32),
            config.fault_config,
        ));

        #[allow(clippy::expect_used)] // Constant inputs; failure is a programming error
        let keys = SigningKeys::hs256(SIM_HS256_SECRET).expect("simulation key is valid");
        #[allow(clippy::expect_used)]
        let hasher = SecretHasher::new(HashParams::MINIMAL).expect("minimal params are valid");

        let service = AuthService::new(AuthDependencies {
            users: users.clone(),
            revocations: revocations.clone(),
            events: Arc::new(TracingEventPublisher),
            clock: clock.clone(),
            keys: Arc::new(KeyRing::with_keys(keys)),
            hasher,
            policy: TokenPolicy {
                access_ttl: config.access_ttl,
                refresh_ttl: config.refresh_ttl,
                issuer: TokenPolicy::DEFAULT_ISSUER.to_string(),
            },
        });

        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            clock,
            service,
            users,
            revocations,
            registry,
            history: OperationHistory::new(),
            checker: InvariantChecker::new(),
            known_users: Vec::new(),
            sessions: Vec::new(),
            next_user: 0,
            operations: 0,
            successes: 0,
            failures: 0,
        }
    }

    /// Run the simulation for a given number of operations.
    pub fn run(&mut self, operation_count: usize) -> SimulationResult {
        for _ in 0..operation_count {
            let operation = self.next_operation();
            let succeeded = self.execute(operation);
            self.operations += 1;
            if succeeded {
                self.successes += 1;
            } else {
                self.failures += 1;
            }
        }

        SimulationResult {
            seed: self.config.seed,
            operations: self.operations,
            successes: self.successes,
            failures: self.failures,
            injected_faults: self.users.injected_faults() + self.revocations.injected_faults(),
            invariant_violations: self.checker.violations().to_vec(),
        }
    }

    /// Get the operation history.
    #[must_use]
    pub const fn history(&self) -> &OperationHistory {
        &self.history
    }

    /// Get the invariant checker.
    #[must_use]
    pub const fn checker(&self) -> &InvariantChecker {
        &self.checker
    }

    fn next_operation(&mut self) -> Operation {
        if self.known_users.is_empty() {
            return Operation::Register;
        }
        let roll = self.rng.random_range(0..100u32);
        let operation = match roll {
            0..10 => Operation::Register,
            10..30 => Operation::Login {
                correct_secret: true,
            },
            30..38 => Operation::Login {
                correct_secret: false,
            },
            38..58 => Operation::Authenticate,
            58..70 => Operation::Refresh,
            70..78 => Operation::Logout {
                with_refresh: self.rng.random_bool(0.5),
            },
            78..88 => Operation::AdvanceClock,
            88..94 => Operation::Prune,
            _ => Operation::Tamper,
        };
        match operation {
            Operation::Register if self.known_users.len() >= self.config.max_users => {
                Operation::Login {
                    correct_secret: true,
                }
            }
            Operation::Authenticate
            | Operation::Refresh
            | Operation::Logout { .. }
            | Operation::Tamper
                if self.sessions.is_empty() =>
            {
                Operation::Login {
                    correct_secret: true,
                }
            }
            other => other,
        }
    }

    /// Execute one operation and check its outcome. Returns whether the
    /// service accepted it.
    fn execute(&mut self, operation: Operation) -> bool {
        match operation {
            Operation::Register => self.register(),
            Operation::Login { correct_secret } => self.login(correct_secret),
            Operation::Authenticate => self.authenticate(),
            Operation::Refresh => self.refresh(),
            Operation::Logout { with_refresh } => self.logout(with_refresh),
            Operation::AdvanceClock => {
                let step = self.rng.random_range(0..=self.config.max_clock_step_ms);
                self.clock.advance(step);
                true
            }
            Operation::Prune => self.prune(),
            Operation::Tamper => self.tamper(),
        }
    }

    fn register(&mut self) -> bool {
        let n = self.next_user;
        self.next_user += 1;
        let username = format!("user{n}");
        let secret = format!("secret-{n}-{}", self.config.seed);

        let result = self.service.register(&NewUser {
            username: username.clone(),
            email: format!("{username}@example.com"),
            secret: secret.clone(),
            roles: Vec::new(),
            bucket_id: None,
        });
        match result {
            Ok(profile) => {
                self.known_users.push(SimUser {
                    id: profile.id,
                    username,
                    secret,
                });
                true
            }
            Err(AuthError::StoreUnavailable(_)) => false,
            Err(e) => {
                self.checker.record(
                    self.operations,
                    format!("registering fresh user {username} failed with {e:?}"),
                );
                false
            }
        }
    }

    fn login(&mut self, correct_secret: bool) -> bool {
        let index = self.rng.random_range(0..self.known_users.len());
        let Some(user) = self.known_users.get(index) else {
            return false;
        };
        let secret = if correct_secret {
            user.secret.clone()
        } else {
            format!("{}-wrong", user.secret)
        };
        let subject = user.id;

        let result = self
            .service
            .login(&Credential::new(user.username.clone(), secret));
        self.checker
            .check_login(self.operations, correct_secret, &subject, &result);

        match result {
            Ok(pair) => {
                self.record_pair(&pair);
                self.push_session(pair);
                true
            }
            Err(_) => false,
        }
    }

    fn authenticate(&mut self) -> bool {
        let Some(pair) = self.pick_session() else {
            return false;
        };
        let now_ms = self.clock.now_ms();
        let result = self.service.authenticate(&pair.access.token);
        self.checker.check_validation(
            self.operations,
            &self.history,
            &pair.access.token_id,
            now_ms,
            &result,
        );
        result.is_ok()
    }

    fn refresh(&mut self) -> bool {
        let Some(pair) = self.pick_session() else {
            return false;
        };
        let now_ms = self.clock.now_ms();
        let result = self.service.refresh(&pair.refresh.token);
        self.checker.check_refresh(
            self.operations,
            &self.history,
            &pair.refresh.token_id,
            now_ms,
            &result,
        );

        match result {
            Ok(next) => {
                self.history.record_revoked(&pair.refresh.token_id);
                self.record_pair(&next);
                self.push_session(next);
                true
            }
            Err(AuthError::StoreUnavailable(_)) => {
                self.history.record_maybe_revoked(&pair.refresh.token_id);
                false
            }
            Err(_) => false,
        }
    }

    fn logout(&mut self, with_refresh: bool) -> bool {
        let Some(pair) = self.pick_session() else {
            return false;
        };
        let now_ms = self.clock.now_ms();
        let refresh = with_refresh.then_some(pair.refresh.token.as_str());
        let result = self.service.logout(&pair.access.token, refresh);
        self.checker.check_logout(
            self.operations,
            &self.history,
            &pair.access.token_id,
            now_ms,
            &result,
        );

        if result.is_ok() {
            self.history.record_revoked(&pair.access.token_id);
        } else {
            self.history.record_maybe_revoked(&pair.access.token_id);
        }
        if with_refresh {
            // Already revoked, expired or just revoked; the model cannot tell.
            self.history.record_maybe_revoked(&pair.refresh.token_id);
        }
        result.is_ok()
    }

    fn prune(&mut self) -> bool {
        let now_ms = self.clock.now_ms();
        let len = self
            .registry
            .prune(now_ms)
            .and_then(|_| self.registry.len());
        match len {
            Ok(len) => {
                self.checker
                    .check_registry_size(self.operations, &self.history, now_ms, len);
                true
            }
            Err(e) => {
                self.checker
                    .record(self.operations, format!("unfaulted prune failed: {e}"));
                false
            }
        }
    }

    fn tamper(&mut self) -> bool {
        let Some(pair) = self.pick_session() else {
            return false;
        };
        let target = if self.rng.random_bool(0.5) {
            &pair.access
        } else {
            &pair.refresh
        };
        let tampered = tamper_payload(target);
        let result = self.service.authenticate(&tampered);
        self.checker.check_tampered(self.operations, &result);
        result.is_ok()
    }

    fn pick_session(&mut self) -> Option<TokenPair> {
        if self.sessions.is_empty() {
            return None;
        }
        let index = self.rng.random_range(0..self.sessions.len());
        self.sessions.get(index).cloned()
    }

    fn push_session(&mut self, pair: TokenPair) {
        if self.sessions.len() >= MAX_SESSIONS {
            self.sessions.remove(0);
        }
        self.sessions.push(pair);
    }

    fn record_pair(&mut self, pair: &TokenPair) {
        for token in [&pair.access, &pair.refresh] {
            self.history.record_issued(
                token.token_id,
                token.subject,
                token.token_type,
                token.expires_at_ms(),
            );
        }
    }
}

/// Swap one character in the middle of the payload segment.
///
/// A middle character always carries full bits, so the decoded payload
/// changes and the signature no longer matches.
fn tamper_payload(token: &IssuedToken) -> String {
    let mut segments: Vec<String> = token.token.split('.').map(str::to_string).collect();
    if let Some(payload) = segments.get_mut(1)
        && payload.len() > 2
    {
        let at = payload.len() / 2;
        let replacement = if payload.get(at..=at) == Some("A") {
            "B"
        } else {
            "A"
        };
        payload.replace_range(at..=at, replacement);
    }
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulator_basic() {
        let mut simulator = Simulator::new(SimulatorConfig::new(12345));

        let result = simulator.run(200);

        assert_eq!(result.operations, 200);
        assert_eq!(result.successes + result.failures, 200);
        assert_eq!(result.injected_faults, 0);
        assert!(
            result.passed(),
            "Simulation should pass: {:?}",
            result.invariant_violations
        );
        assert!(!simulator.history().is_empty());
    }

    #[test]
    fn test_simulator_many_seeds() {
        for seed in 0..8 {
            let mut simulator = Simulator::new(SimulatorConfig::new(seed));
            let result = simulator.run(150);
            assert!(
                result.passed(),
                "seed {seed} failed: {:?}",
                result.invariant_violations
            );
        }
    }

    #[test]
    fn test_simulator_with_faults() {
        let config = SimulatorConfig::new(777).with_fault_config(FaultConfig::high_faults());
        let mut simulator = Simulator::new(config);

        let result = simulator.run(300);

        assert!(result.injected_faults > 0);
        assert!(result.failures > 0);
        assert!(
            result.passed(),
            "faults must surface only as store failures: {:?}",
            result.invariant_violations
        );
    }

    #[test]
    fn test_simulator_short_lifetimes() {
        // Tokens expire within a few clock steps.
        let config = SimulatorConfig::new(4242)
            .with_ttls(Duration::from_secs(30), Duration::from_secs(90))
            .with_fault_config(FaultConfig::low_faults());
        let mut simulator = Simulator::new(config);

        let result = simulator.run(300);

        assert!(result.passed(), "{:?}", result.invariant_violations);
        assert!(simulator.checker().violations().is_empty());
    }

    #[test]
    fn test_simulator_deterministic() {
        let run = || {
            let config = SimulatorConfig::new(2024).with_fault_config(FaultConfig::low_faults());
            let result = Simulator::new(config).run(150);
            (
                result.operations,
                result.successes,
                result.failures,
                result.injected_faults,
            )
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_tamper_payload_changes_token() {
        let token = IssuedToken {
            token: "aGVhZGVy.cGF5bG9hZA.c2ln".to_string(),
            token_id: crate::types::TokenId([1; 16]),
            token_type: crate::auth::TokenType::Access,
            subject: UserId([2; 16]),
            issued_at: 0,
            expires_at: 1,
        };
        let tampered = tamper_payload(&token);
        assert_ne!(tampered, token.token);
        assert!(tampered.starts_with("aGVhZGVy."));
        assert!(tampered.ends_with(".c2ln"));
    }

    #[test]
    #[ignore] // Long running test
    fn test_simulator_stress() {
        let config = SimulatorConfig::new(99999).with_fault_config(FaultConfig::low_faults());
        let mut simulator = Simulator::new(config);

        let result = simulator.run(10_000);

        assert!(result.passed(), "{:?}", result.invariant_violations);
    }
}
