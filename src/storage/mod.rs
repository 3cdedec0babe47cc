//! Credential store: identities plus challenge and session credentials.
//!
//! [`CredentialStore`] is the seam every manager talks to. [`RedisStore`] is
//! the durable backend; [`memory::MemoryStore`] serves development and tests.
//!
//! Redis access is implemented as free async functions over
//! `redis::AsyncCommands` in [`identity`] and [`credential`].

pub mod credential;
pub mod identity;
pub mod memory;

use crate::models::{CredentialKind, Identity, StoredCredential};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;

pub use memory::MemoryStore;

/// Maximum number of keys returned by scan_keys to prevent unbounded memory allocation.
const SCAN_MAX_KEYS: usize = 10_000;

/// Infrastructure failure talking to the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage operations the authentication core relies on.
///
/// Every method is a single atomic step with respect to the credential it
/// touches, so a cancelled request never leaves a token half-written.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Return the identity for `address`, creating it if absent.
    ///
    /// Concurrent calls for the same address observe the same identity.
    async fn upsert_identity(&self, address: &str, now: u64) -> Result<Identity, StoreError>;

    /// Persist a credential. `ttl` bounds how long the backend keeps the row.
    async fn insert_credential(
        &self,
        credential: &StoredCredential,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Look up a credential without modifying it. Expiry is not checked.
    async fn get_credential(
        &self,
        kind: CredentialKind,
        token: &str,
    ) -> Result<Option<StoredCredential>, StoreError>;

    /// Atomically look up and delete a credential.
    ///
    /// With `owner = Some(address)` the credential is only taken when it
    /// belongs to that address; otherwise it is left untouched and `None` is
    /// returned. Of any number of racing callers at most one gets `Some`.
    async fn take_credential(
        &self,
        kind: CredentialKind,
        token: &str,
        owner: Option<&str>,
    ) -> Result<Option<StoredCredential>, StoreError>;

    /// Persist `credential` as the only one of its kind its identity holds.
    ///
    /// Earlier credentials of that kind are deleted in the same atomic step,
    /// so concurrent replacements for one identity leave exactly one behind.
    /// Returns how many were displaced.
    async fn replace_credential(
        &self,
        credential: &StoredCredential,
        ttl: Duration,
    ) -> Result<usize, StoreError>;

    /// Drop bookkeeping for credentials that are no longer valid at `now`.
    async fn sweep_expired(&self, now: u64) -> Result<usize, StoreError>;
}

/// Redis-backed [`CredentialStore`].
#[derive(Clone)]
pub struct RedisStore {
    con: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    /// Open a multiplexed connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let con = client.get_multiplexed_async_connection().await?;
        Ok(Self { con })
    }

    pub fn from_connection(con: redis::aio::MultiplexedConnection) -> Self {
        Self { con }
    }
}

#[async_trait]
impl CredentialStore for RedisStore {
    async fn upsert_identity(&self, address: &str, now: u64) -> Result<Identity, StoreError> {
        let mut con = self.con.clone();
        identity::upsert_identity(&mut con, address, now).await
    }

    async fn insert_credential(
        &self,
        credential: &StoredCredential,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut con = self.con.clone();
        self::credential::store_credential(&mut con, credential, ttl).await
    }

    async fn get_credential(
        &self,
        kind: CredentialKind,
        token: &str,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let mut con = self.con.clone();
        self::credential::get_credential(&mut con, kind, token).await
    }

    async fn take_credential(
        &self,
        kind: CredentialKind,
        token: &str,
        owner: Option<&str>,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let mut con = self.con.clone();
        self::credential::get_and_delete_credential(&mut con, kind, token, owner).await
    }

    async fn replace_credential(
        &self,
        credential: &StoredCredential,
        ttl: Duration,
    ) -> Result<usize, StoreError> {
        let mut con = self.con.clone();
        self::credential::replace_credential(&mut con, credential, ttl).await
    }

    async fn sweep_expired(&self, now: u64) -> Result<usize, StoreError> {
        let mut con = self.con.clone();
        self::credential::prune_tracking_sets(&mut con, now).await
    }
}

/// Scan for Redis keys matching a pattern using SCAN (non-blocking).
///
/// Unlike KEYS, SCAN does not block the Redis server during iteration.
/// Capped at SCAN_MAX_KEYS results to prevent unbounded memory growth.
pub async fn scan_keys<C>(con: &mut C, pattern: &str) -> Result<Vec<String>, redis::RedisError>
where
    C: AsyncCommands,
{
    let mut all_keys = Vec::new();
    let mut cursor: u64 = 0;
    loop {
        let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(100)
            .query_async(con)
            .await?;
        all_keys.extend(keys);
        if all_keys.len() >= SCAN_MAX_KEYS {
            all_keys.truncate(SCAN_MAX_KEYS);
            break;
        }
        cursor = new_cursor;
        if cursor == 0 {
            break;
        }
    }
    Ok(all_keys)
}
