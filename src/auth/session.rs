//! Session token minting, resolution and revocation.

use crate::clock::Clock;
use crate::models::{CredentialKind, IdentityRef, StoredCredential};
use crate::storage::{CredentialStore, StoreError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Generate a cryptographically random session token.
///
/// Returns 64 lowercase hex characters (256 bits).
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

/// A freshly minted session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub token: String,
    pub expires_at: u64,
}

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create_session(&self, identity: &IdentityRef) -> Result<NewSession, StoreError> {
        let now = self.clock.now_millis();
        let token = generate_session_token();
        let expires_at = now.saturating_add(self.ttl.as_millis() as u64);

        let credential = StoredCredential {
            token: token.clone(),
            kind: CredentialKind::Session,
            identity_id: identity.id.clone(),
            address: identity.address.clone(),
            created_at: now,
            expires_at,
        };
        self.store.insert_credential(&credential, self.ttl).await?;

        Ok(NewSession { token, expires_at })
    }

    /// The identity behind `token`, or `None` when the token is unknown,
    /// revoked or expired. Absence is a normal outcome, not an error.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<IdentityRef>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }

        let credential = self
            .store
            .get_credential(CredentialKind::Session, token)
            .await?;

        let now = self.clock.now_millis();
        Ok(credential
            .filter(|c| c.kind == CredentialKind::Session && c.is_valid_at(now))
            .map(|c| c.owner()))
    }

    /// Delete the session if it exists. Revoking an unknown token is a no-op.
    pub async fn revoke_session(&self, token: &str) -> Result<(), StoreError> {
        if token.is_empty() {
            return Ok(());
        }

        self.store
            .take_credential(CredentialKind::Session, token, None)
            .await?;
        Ok(())
    }
}
