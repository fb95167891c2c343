//! In-process stores guarded by `tokio::sync::RwLock`
//!
//! Uniqueness checks and inserts happen under one write lock, which gives the
//! same single-winner outcome as the database constraint.

use super::{RevocationStore, UserStore};
use crate::error::AuthError;
use crate::models::{BlacklistedToken, NewUser, User};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct UserTable {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

/// In-memory credential store
#[derive(Default)]
pub struct MemoryUserStore {
    table: RwLock<UserTable>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        let mut table = self.table.write().await;

        if table.rows.values().any(|u| u.email == user.email) {
            return Err(AuthError::DuplicateEmail);
        }

        table.next_id += 1;
        let now = Utc::now();
        let row = User {
            id: table.next_id,
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            gender: user.gender,
            birth_date: user.birth_date,
            is_active: true,
            is_staff: user.is_staff,
            date_joined: now,
            updated_at: now,
            last_login: None,
        };
        table.rows.insert(row.id, row.clone());

        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let table = self.table.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn delete_user(&self, id: i64) -> Result<(), AuthError> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(AuthError::UserNotFound)
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AuthError> {
        match self.table.write().await.rows.get_mut(&id) {
            Some(user) => {
                user.last_login = Some(at);
                user.updated_at = at;
            }
            None => {
                tracing::warn!(user_id = id, "User vanished before last login could be recorded");
            }
        }
        Ok(())
    }
}

/// In-memory refresh token blacklist
#[derive(Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<Uuid, BlacklistedToken>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn insert(
        &self,
        jti: Uuid,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.entries
            .write()
            .await
            .entry(jti)
            .or_insert_with(|| BlacklistedToken {
                jti,
                user_id,
                expires_at,
                blacklisted_at: Utc::now(),
            });
        Ok(())
    }

    async fn contains(&self, jti: Uuid) -> Result<bool, AuthError> {
        Ok(self.entries.read().await.contains_key(&jti))
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        Ok((before - entries.len()) as u64)
    }
}
