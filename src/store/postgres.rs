//! PostgreSQL stores and schema setup

use super::{RevocationStore, UserStore};
use crate::error::AuthError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Create the account tables if they do not exist yet
pub async fn run_migrations(db: &PgPool) -> Result<(), AuthError> {
    tracing::info!("Running account database migrations");

    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE user_gender AS ENUM ('M', 'F');
        EXCEPTION
            WHEN duplicate_object THEN null;
        END $$;
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email VARCHAR(40) NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            name VARCHAR(30) NOT NULL,
            gender user_gender NOT NULL,
            birth_date DATE NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            is_staff BOOLEAN NOT NULL DEFAULT FALSE,
            date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            last_login TIMESTAMPTZ,
            CONSTRAINT users_email_key UNIQUE (email)
        );
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS token_blacklist (
            jti UUID PRIMARY KEY,
            user_id BIGINT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            blacklisted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_token_blacklist_expires ON token_blacklist(expires_at);",
    )
    .execute(db)
    .await?;

    tracing::info!("Account migrations completed successfully");
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Map an insert failure, letting the email constraint surface as a duplicate
fn insert_error(err: sqlx::Error) -> AuthError {
    if is_unique_violation(&err) {
        AuthError::DuplicateEmail
    } else {
        err.into()
    }
}

/// Users table backed store
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, gender, birth_date, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.gender)
        .bind(user.birth_date)
        .bind(user.is_staff)
        .fetch_one(&self.db)
        .await;

        result.map_err(|err| {
            if is_unique_violation(&err) {
                tracing::debug!(email = %user.email, "Email uniqueness constraint rejected insert");
            }
            insert_error(err)
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<(), AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }

        Ok(())
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET last_login = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(user_id = id, "User vanished before last login could be recorded");
        }

        Ok(())
    }
}

/// Token blacklist table backed store
#[derive(Clone)]
pub struct PgRevocationStore {
    db: PgPool,
}

impl PgRevocationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn insert(
        &self,
        jti: Uuid,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO token_blacklist (jti, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn contains(&self, jti: Uuid) -> Result<bool, AuthError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT jti FROM token_blacklist WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.db)
            .await?;
        Ok(found.is_some())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < $1")
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct StubDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for StubDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "stub database error")
        }
    }

    impl StdError for StubDbError {}

    impl DatabaseError for StubDbError {
        fn message(&self) -> &str {
            "stub database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn db_error(code: Option<&'static str>) -> sqlx::Error {
        sqlx::Error::Database(Box::new(StubDbError { code }))
    }

    #[test]
    fn test_unique_violation_matches_sqlstate() {
        assert!(is_unique_violation(&db_error(Some("23505"))));
        assert!(!is_unique_violation(&db_error(Some("23503"))));
        assert!(!is_unique_violation(&db_error(None)));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn test_insert_error_maps_constraint_to_duplicate_email() {
        assert!(matches!(
            insert_error(db_error(Some("23505"))),
            AuthError::DuplicateEmail
        ));
        assert!(matches!(
            insert_error(db_error(Some("23503"))),
            AuthError::Database(_)
        ));
        assert!(matches!(
            insert_error(sqlx::Error::RowNotFound),
            AuthError::Database(_)
        ));
    }
}
