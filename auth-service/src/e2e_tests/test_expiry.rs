//! Access tokens expire on the injected clock, with no leeway.

use std::time::Duration;

use crate::e2e_tests::helpers::*;

#[test]
fn test_access_token_valid_before_expiry() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    advance(&t, Duration::from_secs(4 * 60));

    let verified = t
        .service
        .authenticate(&pair.access.token)
        .expect("still valid after four minutes");
    assert_eq!(verified.remaining, Duration::from_secs(60));
}

#[test]
fn test_access_token_expired_after_lifetime() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    advance(&t, Duration::from_secs(6 * 60));

    assert_eq!(
        t.service.authenticate(&pair.access.token).map(|_| ()),
        Err(AuthError::Expired)
    );
}

#[test]
fn test_expiry_boundary_is_exclusive() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    advance(&t, Duration::from_secs(5 * 60) - Duration::from_millis(1));
    assert!(t.service.authenticate(&pair.access.token).is_ok());

    advance(&t, Duration::from_millis(1));
    assert_eq!(
        t.service.authenticate(&pair.access.token).map(|_| ()),
        Err(AuthError::Expired)
    );
}

#[test]
fn test_refresh_outlives_access() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    advance(&t, Duration::from_secs(10 * 60));
    assert_eq!(
        t.service.authenticate(&pair.access.token).map(|_| ()),
        Err(AuthError::Expired)
    );

    let next = t.service.refresh(&pair.refresh.token).expect("refresh still valid");
    assert!(t.service.authenticate(&next.access.token).is_ok());

    advance(&t, Duration::from_secs(60 * 60));
    assert_eq!(
        t.service.refresh(&next.refresh.token).map(|_| ()),
        Err(AuthError::Expired)
    );
}
