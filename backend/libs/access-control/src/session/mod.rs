//! Session store adapter
//!
//! A [`Session`] is an explicit per-request context: opened from a
//! [`SessionStore`] at request start, threaded through every access call,
//! and flushed at request end. Only keys changed during the request are
//! written back, so two overlapping requests from the same visitor (two
//! tabs) cannot erase each other's updates; the last write to a given key
//! wins.

mod memory;
mod redis_store;

pub use self::memory::MemorySessionStore;
pub use self::redis_store::RedisSessionStore;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

use crate::error::SessionError;
use crate::role::{Role, UserId};

/// Session keys read or written by the access core
pub mod keys {
    pub const USER_ID: &str = "user_id";
    pub const ROLE: &str = "role";
    pub const IS_LOGGED_IN: &str = "is_logged_in";
    /// Written only by the admin-bridge
    pub const URL_ADMIN_STATUS: &str = "url_admin_status";
}

pub type SessionData = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts only well-formed ids; cookie values are untrusted.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim())
            .ok()
            .map(|id| Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Keys changed during one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionChanges {
    pub cleared: bool,
    pub set: HashMap<String, Value>,
    pub removed: HashSet<String>,
}

impl SessionChanges {
    pub fn is_empty(&self) -> bool {
        !self.cleared && self.set.is_empty() && self.removed.is_empty()
    }

    /// Apply this change set onto stored data.
    pub fn apply_to(&self, data: &mut SessionData) {
        if self.cleared {
            data.clear();
        }
        for key in &self.removed {
            data.remove(key);
        }
        for (key, value) in &self.set {
            data.insert(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    data: SessionData,
    changes: SessionChanges,
    active: bool,
    fresh: bool,
}

impl Session {
    /// A new, not yet started session.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            data: SessionData::new(),
            changes: SessionChanges::default(),
            active: false,
            fresh: true,
        }
    }

    /// An active session restored from a store.
    pub fn restore(id: SessionId, data: SessionData) -> Self {
        Self {
            id,
            data,
            changes: SessionChanges::default(),
            active: true,
            fresh: false,
        }
    }

    /// Start the session. Starting an active session is a no-op.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        tracing::debug!(session_id = %self.id, "Session started");
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True when the session was issued during this request.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        self.changes.removed.remove(key);
        self.changes.set.insert(key.to_string(), value.clone());
        self.data.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) {
        if self.data.remove(key).is_some() || self.changes.set.contains_key(key) {
            self.changes.set.remove(key);
            self.changes.removed.insert(key.to_string());
        }
    }

    /// Drop every key, e.g. on logout.
    pub fn clear(&mut self) {
        self.data.clear();
        self.changes = SessionChanges {
            cleared: true,
            ..SessionChanges::default()
        };
    }

    /// Booleans are accepted as JSON `true`/`false`, `1`/`0` or `"1"`/`"0"`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.as_str() {
                "1" | "true" => Some(true),
                "0" | "false" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self.get(keys::USER_ID)? {
            Value::Number(n) => n.as_i64().map(UserId),
            Value::String(s) => s.parse().ok().map(UserId),
            _ => None,
        }
    }

    /// Cached role label, if one was stored at login.
    pub fn cached_role(&self) -> Option<Role> {
        self.get_str(keys::ROLE).map(Role::parse)
    }

    /// An active authenticated user: `is_logged_in` set and a `user_id` present.
    pub fn is_logged_in(&self) -> bool {
        self.get_bool(keys::IS_LOGGED_IN).unwrap_or(false) && self.user_id().is_some()
    }

    /// Record a login issued by the (external) authentication flow.
    pub fn establish_login(&mut self, user_id: UserId, role: Role) {
        self.start();
        self.set(keys::USER_ID, user_id.0);
        self.set(keys::ROLE, role.as_str());
        self.set(keys::IS_LOGGED_IN, true);
    }

    /// Forget the authenticated user but keep the session itself.
    pub fn drop_login(&mut self) {
        self.remove(keys::USER_ID);
        self.remove(keys::ROLE);
        self.remove(keys::IS_LOGGED_IN);
    }

    pub fn changes(&self) -> &SessionChanges {
        &self.changes
    }

    pub fn take_changes(&mut self) -> SessionChanges {
        std::mem::take(&mut self.changes)
    }
}

/// Backing store for sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError>;

    async fn apply(&self, id: &SessionId, changes: &SessionChanges) -> Result<(), SessionError>;

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError>;

    /// Open the visitor's session, issuing a new one when the id is absent,
    /// unknown or the store cannot answer.
    async fn open(&self, id: Option<SessionId>) -> Session {
        let Some(id) = id else {
            let mut session = Session::new(SessionId::generate());
            session.start();
            return session;
        };

        match self.load(&id).await {
            Ok(Some(data)) => Session::restore(id, data),
            Ok(None) => {
                tracing::debug!(session_id = %id, "Unknown or expired session, issuing new one");
                let mut session = Session::new(SessionId::generate());
                session.start();
                session
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session load failed, continuing with empty session");
                let mut session = Session::new(SessionId::generate());
                session.start();
                session
            }
        }
    }

    /// Persist the keys changed during this request.
    async fn flush(&self, session: &mut Session) -> Result<(), SessionError> {
        if session.changes().is_empty() {
            return Ok(());
        }
        let changes = session.take_changes();
        self.apply(session.id(), &changes).await
    }
}
