//! Refresh tokens rotate: each one buys exactly one new pair.

use std::sync::Arc;
use std::thread;

use crate::auth::TokenType;
use crate::e2e_tests::helpers::*;

#[test]
fn test_refresh_chain() {
    let t = service();
    let profile = register(&t, "alice", "secret123");
    let mut pair = login(&t, "alice", "secret123");

    for _ in 0..5 {
        let next = t.service.refresh(&pair.refresh.token).expect("refreshed");
        assert_eq!(next.access.subject, profile.id);
        assert_ne!(next.access.token_id, pair.access.token_id);
        assert_ne!(next.refresh.token_id, pair.refresh.token_id);
        assert_eq!(
            t.service.refresh(&pair.refresh.token).map(|_| ()),
            Err(AuthError::Revoked)
        );
        pair = next;
    }

    assert!(t.service.authenticate(&pair.access.token).is_ok());
}

#[test]
fn test_old_access_token_survives_refresh() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    t.service.refresh(&pair.refresh.token).expect("refreshed");

    // Only the refresh token is consumed; the access token runs out on its own.
    assert!(t.service.authenticate(&pair.access.token).is_ok());
}

#[test]
fn test_tokens_are_not_interchangeable() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    assert_eq!(pair.refresh.token_type, TokenType::Refresh);
    assert_eq!(
        t.service.authenticate(&pair.refresh.token).map(|_| ()),
        Err(AuthError::TokenTypeMismatch)
    );
    assert_eq!(
        t.service.refresh(&pair.access.token).map(|_| ()),
        Err(AuthError::TokenTypeMismatch)
    );
}

#[test]
fn test_concurrent_refresh_has_one_winner() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");
    let token = Arc::new(pair.refresh.token);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = t.service.clone();
            let token = token.clone();
            thread::spawn(move || service.refresh(&token).map(|_| ()))
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread finished"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .all(|r| r.is_ok() || *r == Err(AuthError::Revoked))
    );
}
