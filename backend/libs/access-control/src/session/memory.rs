use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{SessionChanges, SessionData, SessionId, SessionStore};
use crate::error::SessionError;

struct Entry {
    data: SessionData,
    last_seen: Instant,
}

/// Process-local session store with idle-timeout eviction
///
/// Each session id maps to its own entry; the per-entry lock held by
/// `DashMap` serialises overlapping writes from the same visitor.
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, Entry>,
    idle_timeout: Duration,
}

impl MemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session idle for longer than the timeout.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let timeout = self.idle_timeout;
        self.sessions.retain(|_, entry| entry.last_seen.elapsed() <= timeout);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            tracing::debug!(purged, "Purged idle sessions");
        }
        purged
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        let expired = match self.sessions.get_mut(id) {
            None => return Ok(None),
            Some(mut entry) => {
                if entry.last_seen.elapsed() > self.idle_timeout {
                    true
                } else {
                    entry.last_seen = Instant::now();
                    return Ok(Some(entry.data.clone()));
                }
            }
        };

        if expired {
            self.sessions.remove(id);
        }
        Ok(None)
    }

    async fn apply(&self, id: &SessionId, changes: &SessionChanges) -> Result<(), SessionError> {
        let mut entry = self.sessions.entry(id.clone()).or_insert_with(|| Entry {
            data: SessionData::new(),
            last_seen: Instant::now(),
        });
        changes.apply_to(&mut entry.data);
        entry.last_seen = Instant::now();
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        self.sessions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::keys;
    use serde_json::json;

    #[tokio::test]
    async fn test_open_without_id_issues_fresh_session() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = store.open(None).await;

        assert!(session.is_active());
        assert!(session.is_fresh());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_flush_then_reopen() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut session = store.open(None).await;
        session.set(keys::URL_ADMIN_STATUS, true);
        store.flush(&mut session).await.unwrap();

        let reopened = store.open(Some(session.id().clone())).await;
        assert_eq!(reopened.id(), session.id());
        assert!(!reopened.is_fresh());
        assert_eq!(reopened.get_bool(keys::URL_ADMIN_STATUS), Some(true));
    }

    #[tokio::test]
    async fn test_flush_without_changes_writes_nothing() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut session = store.open(None).await;
        store.flush(&mut session).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_requests_keep_both_writes() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut seed = store.open(None).await;
        seed.set("seed", 1);
        store.flush(&mut seed).await.unwrap();
        let id = seed.id().clone();

        let mut tab_a = store.open(Some(id.clone())).await;
        let mut tab_b = store.open(Some(id.clone())).await;
        tab_a.set(keys::URL_ADMIN_STATUS, true);
        tab_b.set("last_page", "/reports");

        store.flush(&mut tab_a).await.unwrap();
        store.flush(&mut tab_b).await.unwrap();

        let merged = store.load(&id).await.unwrap().unwrap();
        assert_eq!(merged.get(keys::URL_ADMIN_STATUS), Some(&json!(true)));
        assert_eq!(merged.get("last_page"), Some(&json!("/reports")));
        assert_eq!(merged.get("seed"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_clear_then_set_flushes_only_new_keys() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut seed = store.open(None).await;
        seed.set(keys::URL_ADMIN_STATUS, true);
        seed.set("seed", 1);
        store.flush(&mut seed).await.unwrap();
        let id = seed.id().clone();

        let mut session = store.open(Some(id.clone())).await;
        session.clear();
        session.set("flash", "signed out");
        store.flush(&mut session).await.unwrap();

        let stored = store.load(&id).await.unwrap().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.get("flash"), Some(&json!("signed out")));
    }

    #[tokio::test]
    async fn test_idle_session_expires() {
        let store = MemorySessionStore::new(Duration::from_millis(10));
        let mut session = store.open(None).await;
        session.set("k", 1);
        store.flush(&mut session).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        let reopened = store.open(Some(session.id().clone())).await;
        assert_ne!(reopened.id(), session.id());
        assert!(reopened.get("k").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemorySessionStore::new(Duration::from_millis(10));
        let mut session = store.open(None).await;
        session.set("k", 1);
        store.flush(&mut session).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.purge_expired(), 1);
    }

    #[tokio::test]
    async fn test_destroy() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut session = store.open(None).await;
        session.set("k", 1);
        store.flush(&mut session).await.unwrap();

        store.destroy(session.id()).await.unwrap();
        assert!(store.load(session.id()).await.unwrap().is_none());
    }
}
