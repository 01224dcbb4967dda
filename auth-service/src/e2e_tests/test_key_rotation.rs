//! Swapping or unloading the signing keys at runtime.

use crate::auth::{KeyMaterial, SigningKeys};
use crate::e2e_tests::helpers::*;
use crate::types::Credential;

fn rs256_keys() -> SigningKeys {
    SigningKeys::from_material(&KeyMaterial::Rs256 {
        private_key_pem: RS256_PRIVATE_KEY.to_string(),
        public_key_pem: RS256_PUBLIC_KEY.to_string(),
    })
    .expect("fixture keys are valid")
}

#[test]
fn test_rs256_login_round_trip() {
    let t = service();
    t.keys.rotate(rs256_keys());
    let profile = register(&t, "alice", "secret123");

    let pair = login(&t, "alice", "secret123");
    let verified = t.service.authenticate(&pair.access.token).expect("valid");
    assert_eq!(verified.subject, profile.id);

    let next = t.service.refresh(&pair.refresh.token).expect("refreshed");
    assert!(t.service.authenticate(&next.access.token).is_ok());
}

#[test]
fn test_rotation_invalidates_old_tokens() {
    let t = service();
    register(&t, "alice", "secret123");
    let before = login(&t, "alice", "secret123");

    t.keys.rotate(rs256_keys());

    assert_eq!(
        t.service.authenticate(&before.access.token).map(|_| ()),
        Err(AuthError::BadSignature)
    );
    let after = login(&t, "alice", "secret123");
    assert!(t.service.authenticate(&after.access.token).is_ok());
}

#[test]
fn test_unloaded_keys_make_signing_unavailable() {
    let t = service();
    register(&t, "alice", "secret123");
    let pair = login(&t, "alice", "secret123");

    t.keys.unload();

    assert_eq!(
        t.service
            .login(&Credential::new("alice", "secret123"))
            .map(|_| ()),
        Err(AuthError::SigningUnavailable)
    );
    assert_eq!(
        t.service.authenticate(&pair.access.token).map(|_| ()),
        Err(AuthError::SigningUnavailable)
    );
    assert!(!AuthError::SigningUnavailable.is_retryable());
}
