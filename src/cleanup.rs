//! Background sweep of expired credentials.
//!
//! Expiry is enforced at read time, so this job only keeps storage bounded:
//! it asks the store to forget credentials that can no longer be redeemed.

use crate::clock::Clock;
use crate::storage::{CredentialStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

/// Run the cleanup loop.
///
/// Sweeps every `interval`; failures are logged and the loop keeps going.
pub async fn run_cleanup_loop(
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if let Err(e) = sweep_once(store.as_ref(), clock.as_ref()).await {
            tracing::error!(error = %e, "Cleanup job failed");
        }
    }
}

/// One sweep. Returns how many credentials were dropped.
pub async fn sweep_once(
    store: &dyn CredentialStore,
    clock: &dyn Clock,
) -> Result<usize, StoreError> {
    let removed = store.sweep_expired(clock.now_millis()).await?;

    if removed > 0 {
        tracing::info!(action = "cleanup", removed, "Cleanup job completed");
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionManager;
    use crate::clock::ManualClock;
    use crate::models::{CredentialKind, IdentityRef};
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_sweep_once_drops_expired_sessions() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let sessions = SessionManager::new(store.clone(), clock.clone(), Duration::from_secs(10));
        let identity = IdentityRef {
            id: "id".to_string(),
            address: "0xabc".to_string(),
        };

        sessions.create_session(&identity).await.unwrap();
        clock.advance(Duration::from_secs(5));
        sessions.create_session(&identity).await.unwrap();

        clock.advance(Duration::from_secs(6));
        let removed = sweep_once(&*store, &*clock).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.credential_count(CredentialKind::Session), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_loop_runs_periodically() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let sessions = SessionManager::new(store.clone(), clock.clone(), Duration::from_secs(1));
        let identity = IdentityRef {
            id: "id".to_string(),
            address: "0xabc".to_string(),
        };
        sessions.create_session(&identity).await.unwrap();
        clock.advance(Duration::from_secs(2));

        let handle = tokio::spawn(run_cleanup_loop(
            store.clone(),
            clock.clone(),
            Duration::from_secs(30),
        ));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.credential_count(CredentialKind::Session), 0);

        handle.abort();
    }
}
