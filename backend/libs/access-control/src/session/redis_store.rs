use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{SessionChanges, SessionData, SessionId, SessionStore};
use crate::error::SessionError;

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Redis-backed session store
///
/// Each session is one hash at `session:{id}`; each session key is a hash
/// field holding a JSON-encoded value. Changed fields are written in one
/// atomic pipeline together with an EXPIRE refresh.
pub struct RedisSessionStore {
    redis: SharedConnectionManager,
    idle_timeout: Duration,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(redis: SharedConnectionManager, idle_timeout: Duration) -> Self {
        Self {
            redis,
            idle_timeout,
            prefix: "session".to_string(),
        }
    }

    pub async fn connect(redis_url: &str, idle_timeout: Duration) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        tracing::info!("Redis session store connected");
        Ok(Self::new(Arc::new(Mutex::new(manager)), idle_timeout))
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, id: &SessionId) -> String {
        format!("{}:{}", self.prefix, id)
    }

    fn ttl_secs(&self) -> i64 {
        self.idle_timeout.as_secs().max(1) as i64
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        let key = self.key(id);
        let mut conn = self.redis.lock().await;

        let (fields, _): (HashMap<String, String>, i64) = redis::pipe()
            .hgetall(&key)
            .expire(&key, self.ttl_secs())
            .query_async(&mut *conn)
            .await?;

        if fields.is_empty() {
            return Ok(None);
        }

        let mut data = SessionData::with_capacity(fields.len());
        for (field, raw) in fields {
            match serde_json::from_str(&raw) {
                Ok(value) => {
                    data.insert(field, value);
                }
                Err(e) => {
                    tracing::warn!(field = %field, error = %e, "Skipping malformed session field");
                }
            }
        }
        Ok(Some(data))
    }

    async fn apply(&self, id: &SessionId, changes: &SessionChanges) -> Result<(), SessionError> {
        let key = self.key(id);
        let mut pipe = redis::pipe();
        pipe.atomic();

        if changes.cleared {
            pipe.del(&key).ignore();
        }
        for field in &changes.removed {
            pipe.hdel(&key, field).ignore();
        }
        for (field, value) in &changes.set {
            pipe.hset(&key, field, serde_json::to_string(value)?).ignore();
        }
        pipe.expire(&key, self.ttl_secs()).ignore();

        let mut conn = self.redis.lock().await;
        pipe.query_async::<_, ()>(&mut *conn).await?;
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        let key = self.key(id);
        let mut conn = self.redis.lock().await;
        conn.del::<_, ()>(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::keys;

    const REDIS_URL: &str = "redis://127.0.0.1:6379";

    #[tokio::test]
    #[ignore] // Requires Redis server
    async fn test_redis_round_trip() {
        let store = RedisSessionStore::connect(REDIS_URL, Duration::from_secs(60))
            .await
            .expect("Failed to connect to Redis")
            .with_prefix("test_session");

        let mut session = store.open(None).await;
        session.set(keys::URL_ADMIN_STATUS, true);
        session.set(keys::USER_ID, 12);
        store.flush(&mut session).await.unwrap();

        let reopened = store.open(Some(session.id().clone())).await;
        assert_eq!(reopened.id(), session.id());
        assert_eq!(reopened.get_bool(keys::URL_ADMIN_STATUS), Some(true));

        store.destroy(session.id()).await.unwrap();
        assert!(store.load(session.id()).await.unwrap().is_none());
    }
}
