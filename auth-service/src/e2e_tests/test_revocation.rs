//! Logout revokes tokens; the registry forgets them once they expire.

use std::time::Duration;

use crate::e2e_tests::helpers::*;
use crate::revocation::RevocationStore;

#[test]
fn test_logout_revokes_access_token() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    t.service
        .logout(&pair.access.token, None)
        .expect("logged out");

    assert_eq!(
        t.service.authenticate(&pair.access.token).map(|_| ()),
        Err(AuthError::Revoked)
    );
    // The refresh token was not presented and stays usable.
    assert!(t.service.refresh(&pair.refresh.token).is_ok());
}

#[test]
fn test_second_logout_reports_revoked() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    t.service
        .logout(&pair.access.token, Some(&pair.refresh.token))
        .expect("logged out");
    assert_eq!(
        t.service.logout(&pair.access.token, None),
        Err(AuthError::Revoked)
    );
    assert_eq!(t.revocations.len().expect("readable"), 2);
}

#[test]
fn test_revoking_one_session_leaves_others() {
    let t = service();
    register(&t, "alice", "secret123");
    let laptop = login(&t, "alice", "secret123");
    let phone = login(&t, "alice", "secret123");

    t.service
        .logout(&laptop.access.token, Some(&laptop.refresh.token))
        .expect("logged out");

    assert!(t.service.authenticate(&phone.access.token).is_ok());
    assert!(t.service.refresh(&phone.refresh.token).is_ok());
}

#[test]
fn test_prune_drops_only_expired_entries() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    t.service
        .logout(&pair.access.token, Some(&pair.refresh.token))
        .expect("logged out");
    assert_eq!(t.revocations.len().expect("readable"), 2);

    // Past the access lifetime, before the refresh lifetime.
    advance(&t, Duration::from_secs(6 * 60));
    let removed = t
        .revocations
        .prune(t.clock.current())
        .expect("pruned");
    assert_eq!(removed, 1);
    assert_eq!(
        t.service.refresh(&pair.refresh.token).map(|_| ()),
        Err(AuthError::Revoked)
    );

    advance(&t, Duration::from_secs(60 * 60));
    assert_eq!(t.revocations.prune(t.clock.current()), Ok(1));
    assert_eq!(t.revocations.len(), Ok(0));
    // Expiry still rejects the token after its entry is gone.
    assert_eq!(
        t.service.refresh(&pair.refresh.token).map(|_| ()),
        Err(AuthError::Expired)
    );
}

#[tokio::test(start_paused = true)]
async fn test_background_pruner_drops_expired_entries() {
    use std::sync::Arc;

    use crate::revocation::{PruneConfig, spawn_prune_task};

    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");
    t.service
        .logout(&pair.access.token, None)
        .expect("logged out");
    assert_eq!(t.revocations.len(), Ok(1));

    advance(&t, Duration::from_secs(6 * 60));
    let handle = spawn_prune_task(
        Arc::downgrade(&t.revocations),
        t.clock.clone(),
        PruneConfig {
            interval: Duration::from_secs(60),
        },
    );

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(t.revocations.len(), Ok(0));
    handle.abort();
}
