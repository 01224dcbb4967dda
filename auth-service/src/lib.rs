// Life of a request:
// 1. A credential or bearer token comes in over HTTP
// 2. Credentials are checked against the user store and the stored hash
// 3. Tokens are issued by the issuer, or checked by the validator against
//    the signing keys, the clock and the revocation registry
// 4. Logout and refresh write to the revocation registry
//
// System components:
//  - User store
//  - Token issuer and validator over a swappable key ring
//  - Revocation registry with a background pruner

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod revocation;
pub mod simulation;
pub mod store;
pub mod types;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod testing;

pub use auth::AuthService;
pub use error::AuthError;
