//! User-record lookup collaborator

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::DirectoryError;
use crate::role::{UserId, UserRecord};

/// Source of persisted user records `{id, role, status}`
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` means the user does not exist; `Err` means the
    /// directory could not answer.
    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError>;
}

/// In-process directory, used for development and tests
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, UserRecord>,
    available: AtomicBool,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.insert(user);
        }
        directory
    }

    pub fn insert(&self, user: UserRecord) {
        self.users.insert(user.id, user);
    }

    pub fn remove(&self, id: UserId) {
        self.users.remove(&id);
    }

    /// Simulate the backing store going down (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable(
                "in-memory directory disabled".to_string(),
            ));
        }
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }
}
