//! Challenge and session Redis operations.
//!
//! Redis key patterns:
//! - `challenge:{nonce}` — challenge credential (JSON)
//! - `session:{token}` — session credential (JSON)
//! - `identity_challenges:{identity_id}` — SET of the identity's challenge nonces
//! - `identity_sessions:{identity_id}` — SET of the identity's session tokens
//!
//! Credential keys carry a physical TTL so Redis reclaims them eventually,
//! but validity is always decided against `expires_at` by the caller.
//!
//! ## Security: Zeroizing Sensitive Data
//!
//! Credential JSON read back from Redis is wrapped in `Zeroizing` so the
//! serialized token is cleared from application memory once parsed.

use super::StoreError;
use crate::models::{CredentialKind, StoredCredential};
use redis::AsyncCommands;
use std::time::Duration;
use zeroize::Zeroizing;

/// Lua script for atomic GET + owner check + DEL.
///
/// ARGV[1] is the required owner address, or an empty string for "any".
const TAKE_SCRIPT: &str = r"
local val = redis.call('GET', KEYS[1])
if not val then
    return false
end
if ARGV[1] ~= '' then
    local ok, cred = pcall(cjson.decode, val)
    if not ok or cred['address'] ~= ARGV[1] then
        return false
    end
end
redis.call('DEL', KEYS[1])
return val
";

/// Lua script that swaps an identity's credentials of one kind for a new one.
///
/// KEYS[1] is the tracking set, KEYS[2] the new credential key.
/// ARGV: credential JSON, TTL in ms, token, key prefix of the kind.
/// Returns how many live credentials were deleted.
const REPLACE_SCRIPT: &str = r"
local displaced = 0
for _, token in ipairs(redis.call('SMEMBERS', KEYS[1])) do
    displaced = displaced + redis.call('DEL', ARGV[4] .. token)
end
redis.call('DEL', KEYS[1])
redis.call('SET', KEYS[2], ARGV[1], 'PX', ARGV[2])
redis.call('SADD', KEYS[1], ARGV[3])
redis.call('PEXPIRE', KEYS[1], ARGV[2])
return displaced
";

fn tracking_key(kind: CredentialKind, identity_id: &str) -> String {
    match kind {
        CredentialKind::Challenge => format!("identity_challenges:{}", identity_id),
        CredentialKind::Session => format!("identity_sessions:{}", identity_id),
    }
}

fn parse_credential(data: String) -> Result<StoredCredential, StoreError> {
    let data = Zeroizing::new(data);
    Ok(serde_json::from_str(&data)?)
}

/// Store a credential with a physical TTL.
///
/// Also adds the token to the identity's tracking set for the credential's kind.
pub async fn store_credential<C>(
    con: &mut C,
    credential: &StoredCredential,
    ttl: Duration,
) -> Result<(), StoreError>
where
    C: AsyncCommands,
{
    let key = credential.kind.key(&credential.token);
    let tracking = tracking_key(credential.kind, &credential.identity_id);
    let json = serde_json::to_string(credential)?;
    let ttl_millis = (ttl.as_millis() as u64).max(1);

    con.pset_ex::<_, _, ()>(&key, json, ttl_millis).await?;

    con.sadd::<_, _, ()>(&tracking, &credential.token).await?;
    // Keep the set alive at least as long as its newest credential
    con.pexpire::<_, ()>(&tracking, ttl_millis as i64).await?;

    Ok(())
}

/// Get a credential by kind and token.
pub async fn get_credential<C>(
    con: &mut C,
    kind: CredentialKind,
    token: &str,
) -> Result<Option<StoredCredential>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(kind.key(token)).await?;
    json.map(parse_credential).transpose()
}

/// Get and delete a credential atomically (single-use).
///
/// Uses a Lua script so that the owner check and the delete happen in one step.
pub async fn get_and_delete_credential<C>(
    con: &mut C,
    kind: CredentialKind,
    token: &str,
    owner: Option<&str>,
) -> Result<Option<StoredCredential>, StoreError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(TAKE_SCRIPT);
    let json: Option<String> = script
        .key(kind.key(token))
        .arg(owner.unwrap_or(""))
        .invoke_async(con)
        .await?;

    let Some(data) = json else {
        return Ok(None);
    };
    let credential = parse_credential(data)?;

    let tracking = tracking_key(kind, &credential.identity_id);
    con.srem::<_, _, ()>(&tracking, token).await?;

    Ok(Some(credential))
}

/// Store a credential as the identity's only one of its kind, atomically.
pub async fn replace_credential<C>(
    con: &mut C,
    credential: &StoredCredential,
    ttl: Duration,
) -> Result<usize, StoreError>
where
    C: AsyncCommands,
{
    let tracking = tracking_key(credential.kind, &credential.identity_id);
    let json = serde_json::to_string(credential)?;
    let ttl_millis = (ttl.as_millis() as u64).max(1);

    let script = redis::Script::new(REPLACE_SCRIPT);
    let displaced: usize = script
        .key(&tracking)
        .key(credential.kind.key(&credential.token))
        .arg(json)
        .arg(ttl_millis)
        .arg(&credential.token)
        .arg(credential.kind.key(""))
        .invoke_async(con)
        .await?;

    Ok(displaced)
}

/// Delete an identity's credentials of one kind that are past `expires_at` at `now`.
///
/// Members whose key already expired in Redis are dropped from the set too.
pub async fn purge_expired<C>(
    con: &mut C,
    identity_id: &str,
    kind: CredentialKind,
    now: u64,
) -> Result<usize, StoreError>
where
    C: AsyncCommands,
{
    let tracking = tracking_key(kind, identity_id);
    let tokens: Vec<String> = con.smembers(&tracking).await?;

    let mut removed = 0;
    for token in &tokens {
        let existing = get_credential(con, kind, token).await?;
        if let Some(credential) = &existing {
            if credential.is_valid_at(now) {
                continue;
            }
            let deleted: i32 = con.del(kind.key(token)).await?;
            removed += deleted as usize;
        }
        con.srem::<_, _, ()>(&tracking, token).await?;
    }

    Ok(removed)
}

/// Remove tracking-set members whose credential is gone or past `expires_at`.
///
/// Credential keys themselves are reclaimed by their Redis TTL; expired ones
/// that are still physically present get deleted here.
pub async fn prune_tracking_sets<C>(con: &mut C, now: u64) -> Result<usize, StoreError>
where
    C: AsyncCommands,
{
    let mut pruned = 0;

    for (kind, pattern) in [
        (CredentialKind::Challenge, "identity_challenges:*"),
        (CredentialKind::Session, "identity_sessions:*"),
    ] {
        let sets = super::scan_keys(con, pattern).await?;
        for set in sets {
            let Some(identity_id) = set.split_once(':').map(|(_, id)| id.to_string()) else {
                continue;
            };
            pruned += purge_expired(con, &identity_id, kind, now).await?;
        }
    }

    Ok(pruned)
}
