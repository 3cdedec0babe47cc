//! Identity Redis operations.
//!
//! Redis key patterns:
//! - `identity:{address}` — identity data (JSON), permanent
//!
//! The normalized address is the unique key, so `SET NX` gives insert-ignore
//! semantics without a separate uniqueness index.

use super::StoreError;
use crate::models::Identity;
use redis::AsyncCommands;
use zeroize::Zeroizing;

fn identity_key(address: &str) -> String {
    format!("identity:{}", address)
}

/// Create the identity for `address` if absent and return the stored one.
///
/// `SET NX` decides the winner when several first requests race; every
/// caller then reads back the same record.
pub async fn upsert_identity<C>(con: &mut C, address: &str, now: u64) -> Result<Identity, StoreError>
where
    C: AsyncCommands,
{
    let key = identity_key(address);
    let candidate = Identity {
        id: nanoid::nanoid!(12),
        address: address.to_string(),
        created_at: now,
    };
    let json = serde_json::to_string(&candidate)?;

    let created: bool = con.set_nx(&key, json).await?;
    if created {
        tracing::debug!(action = "identity_created", identity_id = %candidate.id, "New identity");
        return Ok(candidate);
    }

    match get_identity(con, address).await? {
        Some(identity) => Ok(identity),
        None => Err(StoreError::Redis(redis::RedisError::from((
            redis::ErrorKind::ResponseError,
            "identity vanished after SET NX",
        )))),
    }
}

/// Get an identity by normalized address.
pub async fn get_identity<C>(con: &mut C, address: &str) -> Result<Option<Identity>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(identity_key(address)).await?;

    match json {
        Some(data) => {
            let data = Zeroizing::new(data);
            Ok(Some(serde_json::from_str(&data)?))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_connection() -> Option<redis::aio::MultiplexedConnection> {
        // Note: This test requires a running Redis instance
        // Skip if REDIS_URL is not set
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let client = redis::Client::open(redis_url).ok()?;
        client.get_multiplexed_async_connection().await.ok()
    }

    #[tokio::test]
    async fn test_upsert_identity_is_idempotent() {
        let Some(mut con) = test_connection().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let address = format!("0xtest{}", nanoid::nanoid!(8).to_lowercase());
        let first = upsert_identity(&mut con, &address, 1).await.unwrap();
        let second = upsert_identity(&mut con, &address, 2).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.created_at, 1);

        let _: Result<(), _> = con.del(identity_key(&address)).await;
    }
}
