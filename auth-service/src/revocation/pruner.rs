//! Background pruning of the revocation registry.
//!
//! # Design
//!
//! The task holds a `Weak` reference to the registry so it never keeps it
//! alive: when the last strong reference is dropped, `Weak::upgrade()`
//! returns `None` and the task exits.

use std::sync::{Arc, Weak};
use std::time::Duration;

use super::RevocationStore;
use crate::clock::Clock;

/// Configuration for the prune task.
#[derive(Debug, Clone, Copy)]
pub struct PruneConfig {
    /// Time between prune passes.
    pub interval: Duration,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Spawn a background task that prunes expired revocations.
///
/// # Arguments
/// * `registry` - Weak reference to the registry to prune
/// * `clock` - Source of "now" for each pass
/// * `config` - Prune configuration
///
/// # Returns
/// A `JoinHandle` that can be used to await the task or abort it on shutdown.
///
/// # Invariants
/// - Uses a `Weak` reference to avoid keeping the registry alive
/// - Exits cleanly when the registry is dropped
pub fn spawn_prune_task<R>(
    registry: Weak<R>,
    clock: Arc<dyn Clock>,
    config: PruneConfig,
) -> tokio::task::JoinHandle<()>
where
    R: RevocationStore + ?Sized + 'static,
{
    tokio::spawn(async move {
        prune_loop(registry, clock, config).await;
    })
}

async fn prune_loop<R>(registry: Weak<R>, clock: Arc<dyn Clock>, config: PruneConfig)
where
    R: RevocationStore + ?Sized,
{
    let mut ticker = tokio::time::interval(config.interval.max(Duration::from_millis(1)));
    // The first tick completes immediately; skip it so a pass runs one interval in.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let Some(registry) = registry.upgrade() else {
            tracing::debug!("revocation registry dropped, stopping prune task");
            break;
        };

        match registry.prune(clock.now_ms()) {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "pruned expired revocations"),
            // Prune errors are transient; the next tick retries.
            Err(e) => tracing::warn!("revocation prune failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revocation::InMemoryRevocationRegistry;
    use crate::simulation::SimulatedClock;
    use crate::types::TokenId;

    #[tokio::test(start_paused = true)]
    async fn test_prune_task_removes_expired_entries() {
        let registry = Arc::new(InMemoryRevocationRegistry::new());
        let clock = Arc::new(SimulatedClock::new(10_000));
        registry.revoke(TokenId([1; 16]), 5_000).expect("writable");
        registry.revoke(TokenId([2; 16]), 50_000).expect("writable");

        let handle = spawn_prune_task(
            Arc::downgrade(&registry),
            clock,
            PruneConfig {
                interval: Duration::from_secs(1),
            },
        );

        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert!(!registry.is_revoked(&TokenId([1; 16])).expect("readable"));
        assert!(registry.is_revoked(&TokenId([2; 16])).expect("readable"));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_task_exits_when_registry_dropped() {
        let registry = Arc::new(InMemoryRevocationRegistry::new());
        let clock = Arc::new(SimulatedClock::new(0));

        let handle = spawn_prune_task(
            Arc::downgrade(&registry),
            clock,
            PruneConfig {
                interval: Duration::from_secs(1),
            },
        );

        drop(registry);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(handle.is_finished());
    }
}
