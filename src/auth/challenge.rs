//! Challenge issuance and single-use consumption.

use crate::clock::Clock;
use crate::models::{CredentialKind, IdentityRef, StoredCredential};
use crate::storage::{CredentialStore, StoreError};
use rand::Rng;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

const MESSAGE_PREFIX: &str = "Sign this message to authenticate.\n\nNonce: ";

static NONCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Nonce:\s*([a-f0-9]+)").expect("nonce pattern is valid"));

/// Render the message a wallet signs for `nonce`.
pub fn challenge_message(nonce: &str) -> String {
    format!("{}{}", MESSAGE_PREFIX, nonce)
}

/// Inverse of [`challenge_message`]: the first `Nonce: <hex>` in `message`.
pub fn extract_nonce(message: &str) -> Option<&str> {
    NONCE_PATTERN
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Generate a cryptographically random challenge nonce.
///
/// Returns 32 lowercase hex characters (128 bits).
pub fn generate_challenge_nonce() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

/// Lowercase form used for storage and lookup.
pub fn normalize_address(address: &str) -> String {
    address.to_lowercase()
}

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("Nonce not found in message")]
    Malformed,

    #[error("Challenge not found")]
    NotFound,

    #[error("Challenge expired")]
    Expired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A freshly issued challenge.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub message: String,
    pub nonce: String,
    pub expires_at: u64,
}

pub struct ChallengeManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ChallengeManager {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Issue a challenge for `address`, registering the address if it is new.
    ///
    /// Earlier challenges of the same identity are discarded in the same store
    /// step that writes the new one, so only the most recent message can be
    /// redeemed, even when requests race.
    pub async fn issue_challenge(&self, address: &str) -> Result<IssuedChallenge, StoreError> {
        let address = normalize_address(address);
        let now = self.clock.now_millis();

        let identity = self.store.upsert_identity(&address, now).await?;

        let nonce = generate_challenge_nonce();
        let expires_at = now.saturating_add(self.ttl.as_millis() as u64);
        let credential = StoredCredential {
            token: nonce.clone(),
            kind: CredentialKind::Challenge,
            identity_id: identity.id.clone(),
            address: identity.address.clone(),
            created_at: now,
            expires_at,
        };
        let superseded = self.store.replace_credential(&credential, self.ttl).await?;
        if superseded > 0 {
            tracing::debug!(identity_id = %identity.id, superseded, "Discarded earlier challenges");
        }

        tracing::info!(action = "challenge_issued", identity_id = %identity.id, "Challenge issued");

        Ok(IssuedChallenge {
            message: challenge_message(&nonce),
            nonce,
            expires_at,
        })
    }

    /// Redeem the challenge embedded in `presented_message` for `address`.
    ///
    /// The credential is deleted in the same store step that finds it, so of
    /// several concurrent calls with the same nonce at most one succeeds.
    /// A challenge owned by a different address is left in place.
    pub async fn consume_challenge(
        &self,
        address: &str,
        presented_message: &str,
    ) -> Result<IdentityRef, ChallengeError> {
        let address = normalize_address(address);
        let nonce = extract_nonce(presented_message).ok_or(ChallengeError::Malformed)?;

        let credential = self
            .store
            .take_credential(CredentialKind::Challenge, nonce, Some(&address))
            .await?
            .ok_or(ChallengeError::NotFound)?;

        if !credential.is_valid_at(self.clock.now_millis()) {
            return Err(ChallengeError::Expired);
        }

        Ok(credential.owner())
    }
}
