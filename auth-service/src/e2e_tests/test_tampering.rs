//! Modified or foreign tokens never validate.

use std::sync::Arc;

use crate::auth::{KeyRing, SigningKeys, TokenIssuer, TokenType};
use crate::e2e_tests::helpers::*;
use crate::types::RoleSet;

/// Replace the payload segment with one copied from another token.
fn splice_payload(target: &str, donor: &str) -> String {
    let target: Vec<&str> = target.split('.').collect();
    let donor: Vec<&str> = donor.split('.').collect();
    format!("{}.{}.{}", target[0], donor[1], target[2])
}

#[test]
fn test_flipped_signature_byte_is_rejected() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    let mut bytes = pair.access.token.clone().into_bytes();
    let dot = pair.access.token.rfind('.').expect("three segments");
    // First signature character; always carries full bits.
    bytes[dot + 1] = if bytes[dot + 1] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes).expect("ascii");

    assert_eq!(
        t.service.authenticate(&tampered).map(|_| ()),
        Err(AuthError::BadSignature)
    );
}

#[test]
fn test_swapped_payload_is_rejected() {
    let t = service();
    register(&t, "alice", "secret123");
    register(&t, "mallory", "secret456");
    let alice = login(&t, "alice", "secret123");
    let mallory = login(&t, "mallory", "secret456");

    // Mallory's signature over Alice's claims.
    let forged = splice_payload(&mallory.access.token, &alice.access.token);
    assert_eq!(
        t.service.authenticate(&forged).map(|_| ()),
        Err(AuthError::BadSignature)
    );
}

#[test]
fn test_token_from_another_key_is_rejected() {
    let t = service();
    let profile = register(&t, "alice", "secret123");

    let rogue_keys = Arc::new(KeyRing::with_keys(
        SigningKeys::hs256(b"a-completely-different-secret-of-enough-length")
            .expect("valid key"),
    ));
    let rogue = TokenIssuer::new(rogue_keys, t.clock.clone(), short_policy());
    let roles = RoleSet::try_from_iter(["admin"]).expect("valid roles");
    let forged = rogue
        .issue(profile.id, &roles, TokenType::Access)
        .expect("issued");

    assert_eq!(
        t.service.authenticate(&forged.token).map(|_| ()),
        Err(AuthError::BadSignature)
    );
}

#[test]
fn test_garbage_is_malformed() {
    let t = service();
    for token in ["", "not-a-token", "a.b", "a.b.c"] {
        assert_eq!(
            t.service.authenticate(token).map(|_| ()),
            Err(AuthError::MalformedToken),
            "{token:?}"
        );
    }
}
