//! secp256k1 `personal_sign` signature verification.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// Length of an `r || s || v` recoverable signature.
const SIGNATURE_LEN: usize = 65;

/// EIP-191 hash of a message: `keccak256("\x19Ethereum Signed Message:\n" ++ len ++ message)`.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n");
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Address of a public key: last 20 bytes of keccak256 over the uncompressed point.
///
/// Rendered `0x` + lowercase hex.
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Verify that `signature` over `message` was produced by the key behind `address`.
///
/// # Arguments
/// * `address` - Claimed address, compared case-insensitively
/// * `message` - The exact string that was signed
/// * `signature_hex` - 65-byte `r || s || v` signature as hex, `0x` prefix optional
///
/// # Returns
/// `true` only if recovery succeeds and yields `address`. Every malformed
/// input yields `false`, so callers cannot tell a bad signature from an
/// unparseable one.
pub fn verify_signature(address: &str, message: &str, signature_hex: &str) -> bool {
    match recover_address(message, signature_hex) {
        Some(recovered) => recovered.eq_ignore_ascii_case(address.trim()),
        None => false,
    }
}

fn recover_address(message: &str, signature_hex: &str) -> Option<String> {
    let raw = signature_hex.trim();
    let raw = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);

    let bytes = hex::decode(raw).ok()?;
    if bytes.len() != SIGNATURE_LEN {
        return None;
    }

    let signature = Signature::from_slice(&bytes[..64]).ok()?;
    let v = match bytes[64] {
        27 | 28 => bytes[64] - 27,
        0 | 1 => bytes[64],
        _ => return None,
    };
    let recovery_id = RecoveryId::from_byte(v)?;

    let prehash = personal_message_hash(message.as_bytes());
    let key = VerifyingKey::recover_from_prehash(&prehash, &signature, recovery_id).ok()?;

    Some(address_of(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn generate_test_signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        seed[0] = 1;
        rand::fill(&mut seed[1..]);
        SigningKey::from_slice(&seed).unwrap()
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&personal_message_hash(message.as_bytes()))
            .unwrap();
        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn test_verify_signature_valid() {
        let key = generate_test_signing_key();
        let address = address_of(key.verifying_key());
        let signature = sign(&key, "hello");

        assert!(verify_signature(&address, "hello", &signature));
    }

    #[test]
    fn test_verify_signature_address_case_insensitive() {
        let key = generate_test_signing_key();
        let address = address_of(key.verifying_key()).to_uppercase().replace("0X", "0x");
        let signature = sign(&key, "hello");

        assert!(verify_signature(&address, "hello", &signature));
    }

    #[test]
    fn test_verify_signature_wrong_message() {
        let key = generate_test_signing_key();
        let address = address_of(key.verifying_key());
        let signature = sign(&key, "hello");

        assert!(!verify_signature(&address, "hello!", &signature));
    }

    #[test]
    fn test_verify_signature_wrong_address() {
        let key = generate_test_signing_key();
        let other = generate_test_signing_key();
        let signature = sign(&key, "hello");

        assert!(!verify_signature(
            &address_of(other.verifying_key()),
            "hello",
            &signature
        ));
    }

    #[test]
    fn test_verify_signature_accepts_raw_recovery_id() {
        let key = generate_test_signing_key();
        let address = address_of(key.verifying_key());
        let mut signature = hex::decode(&sign(&key, "hello")[2..]).unwrap();
        signature[64] -= 27;

        assert!(verify_signature(&address, "hello", &hex::encode(signature)));
    }

    #[test]
    fn test_verify_signature_bad_recovery_id() {
        let key = generate_test_signing_key();
        let address = address_of(key.verifying_key());
        let mut signature = hex::decode(&sign(&key, "hello")[2..]).unwrap();
        signature[64] = 35;

        assert!(!verify_signature(&address, "hello", &hex::encode(signature)));
    }

    #[test]
    fn test_verify_signature_malformed_inputs() {
        let key = generate_test_signing_key();
        let address = address_of(key.verifying_key());

        assert!(!verify_signature(&address, "hello", ""));
        assert!(!verify_signature(&address, "hello", "0x"));
        assert!(!verify_signature(&address, "hello", "not-hex"));
        assert!(!verify_signature(&address, "hello", &format!("0x{}", "ab".repeat(64))));
        assert!(!verify_signature(&address, "hello", &format!("0x{}", "00".repeat(65))));
        assert!(!verify_signature("", "hello", &sign(&key, "hello")));
    }

    #[test]
    fn test_personal_message_hash_known_vector() {
        // keccak256("\x19Ethereum Signed Message:\n5hello")
        assert_eq!(
            hex::encode(personal_message_hash(b"hello")),
            "50b2c43fd39106bafbba0da34fc430e1f91e3c96ea2acee2bc34119f92b37750"
        );
    }
}
