//! RustPress Users
//!
//! Account and session system for RustPress providing:
//! - Sign-up with email uniqueness and password confirmation
//! - Sign-in with Argon2id password verification
//! - JWT access and refresh token issuance
//! - Sign-out through a refresh token blacklist
//! - Account withdrawal
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing JWTs (required, min 32 chars)
//! - `JWT_ACCESS_EXPIRATION` - Access token lifetime in seconds (default: 3600)
//! - `JWT_REFRESH_EXPIRATION` - Refresh token lifetime in seconds (default: 604800)
//! - `JWT_ISSUER` - JWT issuer claim (default: "rustpress")
//! - `JWT_AUDIENCE` - JWT audience claim (default: "rustpress-api")
//! - `ARGON2_MEMORY_COST`, `ARGON2_TIME_COST`, `ARGON2_PARALLELISM` - hash cost
//! - `COOKIE_SECURE` - mark token cookies `Secure` (default: false)
//! - `WITHDRAW_SELF_ONLY` - restrict withdrawal to self or staff (default: false)
//! - `DATABASE_URL` - PostgreSQL connection string (server binary only)
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustpress_users::{create_routes, store, AuthConfig, SessionService};
//!
//! store::postgres::run_migrations(&db).await?;
//! let service = Arc::new(SessionService::new(
//!     AuthConfig::from_env()?,
//!     Arc::new(store::PgUserStore::new(db.clone())),
//!     Arc::new(store::PgRevocationStore::new(db)),
//! )?);
//! let app = create_routes(service);
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod form;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::{AuthConfig, ServerConfig};
pub use error::{AuthError, TokenError};
pub use extractors::AuthUser;
pub use handlers::{create_routes, AppState};
pub use ledger::RevocationLedger;
pub use models::*;
pub use service::SessionService;
pub use token::TokenService;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::AuthConfig;
    use crate::models::{Gender, User};
    use chrono::{NaiveDate, Utc};

    /// Valid configuration with cheap Argon2 parameters
    pub fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-key-that-is-long-enough!".to_string(),
            access_token_expiration: 3600,
            refresh_token_expiration: 604800,
            jwt_issuer: "rustpress".to_string(),
            jwt_audience: "rustpress-api".to_string(),
            argon2_memory_cost: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            cookie_secure: false,
            withdraw_self_only: false,
        }
    }

    pub fn sample_user(id: i64) -> User {
        let now = Utc::now();
        User {
            id,
            email: format!("user{id}@x.com"),
            password_hash: String::new(),
            name: "Sample".to_string(),
            gender: Gender::Male,
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            is_active: true,
            is_staff: false,
            date_joined: now,
            updated_at: now,
            last_login: None,
        }
    }
}
