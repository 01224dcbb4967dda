//! End-to-end tests through the public service surface.
//!
//! Each test file covers a specific scenario against a fully wired
//! `AuthService`, using a simulated clock so expiry is deterministic.

#![cfg(test)]

mod helpers;

mod test_expiry;
mod test_key_rotation;
mod test_login_flow;
mod test_refresh_rotation;
mod test_revocation;
mod test_store_unavailable;
mod test_tampering;
