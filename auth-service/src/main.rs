use std::net::SocketAddr;
use std::sync::Arc;

use auth_service::auth::{AuthDependencies, AuthService, KeyRing, SecretHasher, SigningKeys};
use auth_service::clock::{Clock, SystemClock};
use auth_service::config::ServiceConfig;
use auth_service::events::TracingEventPublisher;
use auth_service::http;
use auth_service::revocation::{InMemoryRevocationRegistry, PruneConfig, spawn_prune_task};
use auth_service::store::InMemoryUserStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let keys = match SigningKeys::from_material(&config.key_material) {
        Ok(keys) => keys,
        Err(e) => {
            tracing::error!("Failed to load signing keys: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Loaded configuration: listen_port={}, algorithm={:?}, access_ttl={:?}, refresh_ttl={:?}",
        config.listen_port,
        keys.algorithm(),
        config.token_policy.access_ttl,
        config.token_policy.refresh_ttl,
    );

    let hasher = match SecretHasher::new(config.hash_params) {
        Ok(hasher) => hasher,
        Err(e) => {
            tracing::error!("Invalid hashing parameters: {e}");
            std::process::exit(1);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(InMemoryRevocationRegistry::new());

    let service = Arc::new(AuthService::new(AuthDependencies {
        users: Arc::new(InMemoryUserStore::new()),
        revocations: registry.clone(),
        events: Arc::new(TracingEventPublisher),
        clock: clock.clone(),
        keys: Arc::new(KeyRing::with_keys(keys)),
        hasher,
        policy: config.token_policy,
    }));

    // The pruner holds a weak reference; the service keeps the registry alive.
    let _pruner = spawn_prune_task(
        Arc::downgrade(&registry),
        clock,
        PruneConfig {
            interval: config.prune_interval,
        },
    );
    drop(registry);

    let app = http::router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
