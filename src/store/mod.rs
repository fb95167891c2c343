//! Persistence for users and the refresh-token blacklist
//!
//! Both stores are shared by concurrent requests and are the only sources of
//! truth. [`postgres`] is the production backend; [`memory`] keeps the same
//! guarantees in-process for tests and embedding.

pub mod memory;
pub mod postgres;

use crate::error::AuthError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::{MemoryRevocationStore, MemoryUserStore};
pub use postgres::{PgRevocationStore, PgUserStore};

/// Credential store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A duplicate email fails with [`AuthError::DuplicateEmail`],
    /// decided by the store itself rather than any earlier lookup.
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError>;

    /// Hard delete. Fails with [`AuthError::UserNotFound`] if nothing was removed.
    async fn delete_user(&self, id: i64) -> Result<(), AuthError>;

    /// Record a successful sign-in. A user that vanished meanwhile is a no-op.
    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AuthError>;
}

/// Blacklisted refresh tokens keyed by `jti`
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Insert an entry. Inserting an existing `jti` leaves the first entry
    /// untouched and succeeds.
    async fn insert(
        &self,
        jti: Uuid,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    async fn contains(&self, jti: Uuid) -> Result<bool, AuthError>;

    /// Remove entries whose token expired before `now`, returning how many
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}
