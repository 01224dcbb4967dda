//! Token revocation: the registry contract, an in-memory implementation and
//! the background pruner.

mod pruner;
mod registry;

pub use pruner::{PruneConfig, spawn_prune_task};
pub use registry::{InMemoryRevocationRegistry, RevocationStore};
