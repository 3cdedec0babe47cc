//! walletauth application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Open the credential store (Redis, or in-memory for development)
//! 3. Start the background credential sweep
//! 4. Build router with auth routes and security headers
//! 5. Start Axum server

use std::sync::Arc;
use std::time::Duration;
use walletauth::{
    auth::AppState,
    cleanup,
    clock::{Clock, SystemClock},
    config::{Config, StoreBackend},
    routes,
    storage::{CredentialStore, MemoryStore, RedisStore},
};

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting walletauth on {}", config.bind_addr);

    let store: Arc<dyn CredentialStore> = match &config.store {
        StoreBackend::Redis(url) => {
            let store = RedisStore::connect(url)
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Using Redis credential store");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store; sessions will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if config.cleanup_interval_secs > 0 {
        tokio::spawn(cleanup::run_cleanup_loop(
            store.clone(),
            clock.clone(),
            Duration::from_secs(config.cleanup_interval_secs),
        ));
    }

    let bind_addr = config.bind_addr;
    let app = routes::app(AppState::new(store, clock, config));

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
