//! User store contract and an in-memory implementation.
//!
//! # Pre-conditions
//! - Records handed to `insert` carry a hash produced by the secret hasher.
//!
//! # Post-conditions
//! - Every record returned is a snapshot; changing it never changes the store.
//!
//! # Invariants
//! - Usernames and emails are unique, compared case-insensitively.
//! - Records are never removed; accounts are disabled through `set_status`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::types::{AccountStatus, RoleSet, UserId, UserRecord};

/// Lookup and mutation interface the core uses for user records.
///
/// All timestamps are milliseconds since the Unix epoch supplied by the caller.
pub trait UserStore: Send + Sync {
    /// Find a user by username or email.
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserRecord>, StoreError>;

    fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Record a successful login.
    fn touch_last_login(&self, id: &UserId, at_ms: u64) -> Result<(), StoreError>;

    /// Insert a new record.
    ///
    /// # Errors
    /// Returns `StoreError::Conflict` if the username or email is taken.
    fn insert(&self, record: UserRecord) -> Result<UserRecord, StoreError>;

    /// Add a role and return the updated role snapshot.
    fn add_role(&self, id: &UserId, role: &str, now_ms: u64) -> Result<RoleSet, StoreError>;

    /// Remove a role and return the updated role snapshot.
    fn remove_role(&self, id: &UserId, role: &str, now_ms: u64) -> Result<RoleSet, StoreError>;

    fn set_status(&self, id: &UserId, status: AccountStatus, now_ms: u64)
    -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Users {
    records: HashMap<UserId, UserRecord>,
    /// Lowercased username -> id.
    by_username: HashMap<String, UserId>,
    /// Lowercased email -> id.
    by_email: HashMap<String, UserId>,
}

impl Users {
    fn lookup(&self, identifier: &str) -> Option<&UserRecord> {
        let key = identifier.trim().to_lowercase();
        self.by_username
            .get(&key)
            .or_else(|| self.by_email.get(&key))
            .and_then(|id| self.records.get(id))
    }

    fn get_mut(&mut self, id: &UserId) -> Result<&mut UserRecord, StoreError> {
        self.records.get_mut(id).ok_or(StoreError::UserNotFound)
    }
}

/// Thread-safe in-memory user store.
///
/// One `RwLock` guards the records and both unique indexes, so an insert
/// either lands in all three maps or in none.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<Users>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users (enabled or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().map_or(0, |users| users.records.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("user store lock poisoned".to_string())
}

impl UserStore for InMemoryUserStore {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.lookup(identifier).cloned())
    }

    fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.records.get(id).cloned())
    }

    fn touch_last_login(&self, id: &UserId, at_ms: u64) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let record = users.get_mut(id)?;
        record.last_login_at = Some(at_ms);
        Ok(())
    }

    fn insert(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        let username_key = record.username.to_lowercase();
        let email_key = record.email.to_lowercase();

        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.records.contains_key(&record.id) {
            return Err(StoreError::Conflict { field: "id" });
        }
        // Usernames cannot contain '@' and emails must, so checking each key
        // against both indexes keeps identifiers unambiguous.
        if users.by_username.contains_key(&username_key) || users.by_email.contains_key(&username_key)
        {
            return Err(StoreError::Conflict { field: "username" });
        }
        if users.by_email.contains_key(&email_key) || users.by_username.contains_key(&email_key) {
            return Err(StoreError::Conflict { field: "email" });
        }

        users.by_username.insert(username_key, record.id);
        users.by_email.insert(email_key, record.id);
        users.records.insert(record.id, record.clone());
        drop(users);

        tracing::info!(user_id = %record.id, "user registered");
        Ok(record)
    }

    fn add_role(&self, id: &UserId, role: &str, now_ms: u64) -> Result<RoleSet, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let record = users.get_mut(id)?;
        record.roles = record
            .roles
            .with(role)
            .map_err(|e| StoreError::InvalidInput(e.to_string()))?;
        record.updated_at = now_ms;
        Ok(record.roles.clone())
    }

    fn remove_role(&self, id: &UserId, role: &str, now_ms: u64) -> Result<RoleSet, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let record = users.get_mut(id)?;
        record.roles = record.roles.without(role);
        record.updated_at = now_ms;
        Ok(record.roles.clone())
    }

    fn set_status(
        &self,
        id: &UserId,
        status: AccountStatus,
        now_ms: u64,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let record = users.get_mut(id)?;
        record.status = status;
        record.updated_at = now_ms;
        Ok(())
    }
}
