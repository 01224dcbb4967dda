//! Domain types shared by the verifier, issuer, validator and stores.

pub mod credential;
pub mod ids;
pub mod roles;
pub mod user;

pub use credential::Credential;
pub use ids::{IdParseError, TokenId, UserId};
pub use roles::{RoleError, RoleSet};
pub use user::{AccountStatus, NewUser, RegistrationError, UserProfile, UserRecord, ValidatedUser};
