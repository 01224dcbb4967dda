//! Backing-store failures surface as `StoreUnavailable` and fail closed.

use crate::e2e_tests::helpers::*;
use crate::revocation::RevocationStore;
use crate::simulation::FaultConfig;
use crate::testing::new_user;
use crate::types::Credential;

#[test]
fn test_user_store_down_fails_login() {
    let faulty = faulty_service(FaultConfig {
        user_read_error_rate: 1.0,
        ..FaultConfig::no_faults()
    });
    faulty
        .service
        .register(&new_user("alice", "secret123"))
        .expect("writes are not faulted");

    let result = faulty.service.login(&Credential::new("alice", "secret123"));
    assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
    assert_eq!(faulty.users.len(), 1);
}

#[test]
fn test_user_store_write_failure_fails_registration() {
    let faulty = faulty_service(FaultConfig {
        user_write_error_rate: 1.0,
        ..FaultConfig::no_faults()
    });
    assert!(matches!(
        faulty.service.register(&new_user("alice", "secret123")),
        Err(AuthError::StoreUnavailable(_))
    ));
    assert!(faulty.users.is_empty());
}

#[test]
fn test_revocation_lookup_failure_rejects_token() {
    let faulty = faulty_service(FaultConfig {
        revocation_read_error_rate: 1.0,
        ..FaultConfig::no_faults()
    });
    faulty
        .service
        .register(&new_user("alice", "secret123"))
        .expect("registered");
    let pair = faulty
        .service
        .login(&Credential::new("alice", "secret123"))
        .expect("login does not read revocations");

    let result = faulty.service.authenticate(&pair.access.token);
    assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
    assert!(result.is_err_and(|e| e.is_retryable()));
}

#[test]
fn test_revocation_write_failure_fails_logout() {
    let faulty = faulty_service(FaultConfig {
        revocation_write_error_rate: 1.0,
        ..FaultConfig::no_faults()
    });
    faulty
        .service
        .register(&new_user("alice", "secret123"))
        .expect("registered");
    let pair = faulty
        .service
        .login(&Credential::new("alice", "secret123"))
        .expect("logged in");

    assert!(matches!(
        faulty.service.logout(&pair.access.token, None),
        Err(AuthError::StoreUnavailable(_))
    ));
    assert_eq!(faulty.revocations.len(), Ok(0));
    // Not revoked, so the caller can retry.
    assert!(faulty.service.authenticate(&pair.access.token).is_ok());

    assert!(matches!(
        faulty.service.refresh(&pair.refresh.token),
        Err(AuthError::StoreUnavailable(_))
    ));
}
