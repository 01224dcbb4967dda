//! Register, log in and authenticate a request.

use crate::e2e_tests::helpers::*;
use crate::store::UserStore;
use crate::types::{AccountStatus, Credential};

#[test]
fn test_register_login_authenticate() {
    let t = service();
    let profile = register(&t, "alice", "secret123");

    let pair = login(&t, "alice", "secret123");
    let verified = t
        .service
        .authenticate(&pair.access.token)
        .expect("fresh access token is valid");

    assert_eq!(verified.subject, profile.id);
    assert!(verified.roles.contains("user"));
    assert_eq!(pair.access.subject, profile.id);
    assert_eq!(pair.refresh.subject, profile.id);
    assert!(pair.access.expires_at < pair.refresh.expires_at);
}

#[test]
fn test_login_by_email() {
    let t = service();
    let profile = register(&t, "alice", "secret123");

    let pair = login(&t, "alice@example.com", "secret123");
    assert_eq!(pair.access.subject, profile.id);
}

#[test]
fn test_login_failures() {
    let t = service();
    register(&t, "alice", "secret123");

    assert_eq!(
        t.service
            .login(&Credential::new("alice", "wrongpass"))
            .map(|_| ()),
        Err(AuthError::BadCredentials)
    );
    assert_eq!(
        t.service
            .login(&Credential::new("nobody", "secret123"))
            .map(|_| ()),
        Err(AuthError::NotFound)
    );
}

#[test]
fn test_not_found_and_bad_credentials_share_public_message() {
    let not_found = AuthError::NotFound;
    let bad = AuthError::BadCredentials;
    assert_eq!(not_found.public_message(), bad.public_message());
}

#[test]
fn test_disabled_account_cannot_log_in() {
    let t = service();
    let profile = register(&t, "alice", "secret123");
    t.users
        .set_status(&profile.id, AccountStatus::disabled(), t.clock.current())
        .expect("status updated");

    assert_eq!(
        t.service
            .login(&Credential::new("alice", "secret123"))
            .map(|_| ()),
        Err(AuthError::AccountDisabled)
    );
}

#[test]
fn test_locked_account_cannot_log_in() {
    let t = service();
    let profile = register(&t, "alice", "secret123");
    t.users
        .set_status(&profile.id, AccountStatus::locked(), t.clock.current())
        .expect("status updated");

    assert_eq!(
        t.service
            .login(&Credential::new("alice", "secret123"))
            .map(|_| ()),
        Err(AuthError::AccountLocked)
    );
}

#[test]
fn test_profile_after_login() {
    let t = service();
    let registered = register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    let verified = t.service.authenticate(&pair.access.token).expect("valid");
    let profile = t.service.profile(&verified.subject).expect("profile");
    assert_eq!(profile, registered);
}
