//! In-process [`CredentialStore`] for development and tests.
//!
//! Nothing survives a restart. Atomicity comes from `DashMap` shard locks:
//! `entry` for identity upsert, `remove_if` for single-use takes, and the
//! identity's entry held across a replacement.

use super::{CredentialStore, StoreError};
use crate::models::{CredentialKind, Identity, StoredCredential};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MemoryStore {
    identities: DashMap<String, Identity>,
    credentials: DashMap<String, StoredCredential>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    pub fn credential_count(&self, kind: CredentialKind) -> usize {
        self.credentials
            .iter()
            .filter(|entry| entry.value().kind == kind)
            .count()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn upsert_identity(&self, address: &str, now: u64) -> Result<Identity, StoreError> {
        let identity = self
            .identities
            .entry(address.to_string())
            .or_insert_with(|| Identity {
                id: nanoid::nanoid!(12),
                address: address.to_string(),
                created_at: now,
            })
            .clone();
        Ok(identity)
    }

    async fn insert_credential(
        &self,
        credential: &StoredCredential,
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        self.credentials
            .insert(credential.kind.key(&credential.token), credential.clone());
        Ok(())
    }

    async fn get_credential(
        &self,
        kind: CredentialKind,
        token: &str,
    ) -> Result<Option<StoredCredential>, StoreError> {
        Ok(self
            .credentials
            .get(&kind.key(token))
            .map(|entry| entry.value().clone()))
    }

    async fn take_credential(
        &self,
        kind: CredentialKind,
        token: &str,
        owner: Option<&str>,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let taken = self.credentials.remove_if(&kind.key(token), |_, credential| {
            owner.map_or(true, |address| credential.address == address)
        });
        Ok(taken.map(|(_, credential)| credential))
    }

    async fn replace_credential(
        &self,
        credential: &StoredCredential,
        _ttl: Duration,
    ) -> Result<usize, StoreError> {
        // Serializes replacements for one identity
        let _identity = self.identities.get_mut(&credential.address);

        let mut displaced = 0;
        self.credentials.retain(|_, existing| {
            let stale =
                existing.kind == credential.kind && existing.identity_id == credential.identity_id;
            if stale {
                displaced += 1;
            }
            !stale
        });
        self.credentials
            .insert(credential.kind.key(&credential.token), credential.clone());

        Ok(displaced)
    }

    async fn sweep_expired(&self, now: u64) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.credentials.retain(|_, credential| {
            let valid = credential.is_valid_at(now);
            if !valid {
                removed += 1;
            }
            valid
        });
        Ok(removed)
    }
}
