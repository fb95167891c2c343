//! Account Service Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use std::env;
use std::str::FromStr;

/// Longest accepted token lifetime, ten years in seconds
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// Access token lifetime in seconds (from JWT_ACCESS_EXPIRATION env var)
    pub access_token_expiration: i64,

    /// Refresh token lifetime in seconds (from JWT_REFRESH_EXPIRATION env var)
    pub refresh_token_expiration: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Mark token cookies `Secure` (from COOKIE_SECURE env var)
    pub cookie_secure: bool,

    /// Only allow withdrawing your own account, or any account as staff
    /// (from WITHDRAW_SELF_ONLY env var)
    pub withdraw_self_only: bool,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AuthError::Config("JWT_SECRET environment variable must be set".into()))?;

        Ok(Self {
            jwt_secret,
            access_token_expiration: env_or("JWT_ACCESS_EXPIRATION", 3600), // 1 hour
            refresh_token_expiration: env_or("JWT_REFRESH_EXPIRATION", 604800), // 7 days
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "rustpress".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "rustpress-api".to_string()),
            argon2_memory_cost: env_or("ARGON2_MEMORY_COST", 65536), // 64 MiB
            argon2_time_cost: env_or("ARGON2_TIME_COST", 3),
            argon2_parallelism: env_or("ARGON2_PARALLELISM", 4),
            cookie_secure: env_flag("COOKIE_SECURE"),
            withdraw_self_only: env_flag("WITHDRAW_SELF_ONLY"),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(AuthError::Config(
                "JWT_ACCESS_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiration <= self.access_token_expiration {
            return Err(AuthError::Config(
                "JWT_REFRESH_EXPIRATION must be greater than JWT_ACCESS_EXPIRATION".to_string(),
            ));
        }

        if self.refresh_token_expiration > MAX_TOKEN_LIFETIME_SECS {
            return Err(AuthError::Config(format!(
                "JWT_REFRESH_EXPIRATION must not exceed {MAX_TOKEN_LIFETIME_SECS} seconds"
            )));
        }

        argon2::Params::new(
            self.argon2_memory_cost,
            self.argon2_time_cost,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(())
    }
}

/// Process-level settings for the standalone server binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PostgreSQL connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// Socket address to bind (from LISTEN_ADDR env var)
    pub listen_addr: String,

    /// Seconds between blacklist pruning runs (from BLACKLIST_PRUNE_INTERVAL env var)
    pub prune_interval_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| {
            AuthError::Config("DATABASE_URL environment variable must be set".into())
        })?;

        Ok(Self {
            database_url,
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            prune_interval_secs: env_or("BLACKLIST_PRUNE_INTERVAL", 3600),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .ok()
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}
