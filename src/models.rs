//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent Redis data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Models
// ============================================================================

/// Request for an authentication challenge.
#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default)]
    pub address: String,
}

/// Response containing the message the wallet must sign.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub expires_at: u64,
}

/// Request to verify a signed challenge.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub signature: String, // 0x-prefixed hex, 65 bytes
}

/// Response after successful verification. The session token travels in the cookie.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub address: String,
}

/// Response for logout.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Storage Models
// ============================================================================

/// A wallet address known to the system, as stored in Redis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub address: String, // lowercase
    pub created_at: u64,
}

/// The identity bound to an authenticated request.
///
/// Also the body of `GET /api/user/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRef {
    pub id: String,
    pub address: String,
}

/// Which manager owns a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Challenge,
    Session,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::Challenge => "challenge",
            CredentialKind::Session => "session",
        }
    }

    /// Storage key for a token of this kind. Kinds never share a namespace.
    pub fn key(&self, token: &str) -> String {
        format!("{}:{}", self.as_str(), token)
    }
}

/// Challenge or session record as stored in Redis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token: String,
    pub kind: CredentialKind,
    pub identity_id: String,
    pub address: String,
    pub created_at: u64,
    pub expires_at: u64,
}

impl StoredCredential {
    /// Valid strictly before `expires_at`.
    pub fn is_valid_at(&self, now_millis: u64) -> bool {
        now_millis < self.expires_at
    }

    pub fn owner(&self) -> IdentityRef {
        IdentityRef {
            id: self.identity_id.clone(),
            address: self.address.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_at: u64) -> StoredCredential {
        StoredCredential {
            token: "abc".to_string(),
            kind: CredentialKind::Session,
            identity_id: "id1".to_string(),
            address: "0xabc".to_string(),
            created_at: 0,
            expires_at,
        }
    }

    #[test]
    fn test_credential_valid_strictly_before_expiry() {
        let cred = credential(1_000);
        assert!(cred.is_valid_at(0));
        assert!(cred.is_valid_at(999));
        assert!(!cred.is_valid_at(1_000));
        assert!(!cred.is_valid_at(1_001));
    }

    #[test]
    fn test_kind_keys_are_namespaced() {
        assert_eq!(CredentialKind::Challenge.key("ff"), "challenge:ff");
        assert_eq!(CredentialKind::Session.key("ff"), "session:ff");
    }

    #[test]
    fn test_credential_json_shape() {
        let json = serde_json::to_value(credential(5)).unwrap();
        assert_eq!(json["kind"], "session");
        assert_eq!(json["address"], "0xabc");
        assert_eq!(json["expires_at"], 5);
    }

    #[test]
    fn test_verify_request_missing_fields_default_empty() {
        let req: VerifyRequest = serde_json::from_str(r#"{"address":"0xabc"}"#).unwrap();
        assert_eq!(req.address, "0xabc");
        assert!(req.message.is_empty());
        assert!(req.signature.is_empty());
    }
}
