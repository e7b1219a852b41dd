//! Redis client used for health probes and distributed username locks.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::config::{
    CACHE_PREFIX_LOCK, DEFAULT_LOCK_RETRIES, DEFAULT_LOCK_RETRY_DELAY_MS,
    DEFAULT_LOCK_TTL_SECONDS, LOCK_SCOPE_USERNAME,
};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Redis connection wrapper.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis, returning an error instead of panicking.
    pub async fn try_connect(redis_url: &str) -> Result<Self, RedisError> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis connected");
        Ok(Self { connection })
    }

    pub async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        conn.exists(key).await.map_err(cache_error)
    }

    /// Acquire a lock with `SET NX EX`, retrying up to `max_retries` times.
    pub async fn acquire_lock_with_options(
        &self,
        resource: &str,
        ttl_seconds: u64,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> AppResult<LockToken> {
        let key = format!("{}{}", CACHE_PREFIX_LOCK, resource);
        let lock_id = Uuid::new_v4().to_string();
        let mut conn = self.connection.clone();

        for attempt in 0..=max_retries {
            let acquired: bool = redis::cmd("SET")
                .arg(&key)
                .arg(&lock_id)
                .arg("NX")
                .arg("EX")
                .arg(ttl_seconds)
                .query_async(&mut conn)
                .await
                .map(|r: Option<String>| r.is_some())
                .map_err(cache_error)?;

            if acquired {
                tracing::debug!(resource = %resource, lock_id = %lock_id, "Lock acquired");
                return Ok(LockToken::new(key, lock_id));
            }

            if attempt < max_retries {
                sleep(Duration::from_millis(retry_delay_ms)).await;
            }
        }

        tracing::warn!(resource = %resource, "Failed to acquire lock after retries");
        Err(AppError::internal(format!(
            "Failed to acquire lock for resource: {}",
            resource
        )))
    }

    /// Delete the lock only if `token` still owns it.
    pub async fn release_lock(&self, token: &LockToken) -> AppResult<bool> {
        let mut conn = self.connection.clone();

        let script = r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#;

        let released: i32 = redis::cmd("EVAL")
            .arg(script)
            .arg(1)
            .arg(&token.key)
            .arg(&token.lock_id)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(released == 1)
    }
}

/// Proof of ownership for a held lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    key: String,
    lock_id: String,
}

impl LockToken {
    pub fn new(key: impl Into<String>, lock_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            lock_id: lock_id.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Cross-process mutual exclusion keyed by username.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UsernameLock: Send + Sync {
    async fn acquire(&self, username: &str) -> AppResult<LockToken>;

    async fn release(&self, token: LockToken) -> AppResult<()>;
}

#[async_trait]
impl UsernameLock for Cache {
    async fn acquire(&self, username: &str) -> AppResult<LockToken> {
        self.acquire_lock_with_options(
            &username_resource(username),
            DEFAULT_LOCK_TTL_SECONDS,
            DEFAULT_LOCK_RETRIES,
            DEFAULT_LOCK_RETRY_DELAY_MS,
        )
        .await
    }

    async fn release(&self, token: LockToken) -> AppResult<()> {
        if !self.release_lock(&token).await? {
            // TTL expired before release; another holder may own it now.
            tracing::warn!(key = %token.key(), "Username lock expired before release");
        }
        Ok(())
    }
}

fn username_resource(username: &str) -> String {
    format!("{}{}", LOCK_SCOPE_USERNAME, username)
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}
