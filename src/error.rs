//! Account Error Types
//!
//! Centralized error handling for sign-up, sign-in, sign-out and withdrawal.
//! Field-attributable failures carry per-field messages; credential failures
//! stay deliberately opaque.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;

/// Messages keyed by the request field they belong to.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Generic message returned for every failed credential check.
pub const INVALID_CREDENTIALS_DETAIL: &str = "No active account found with the given credentials";

/// Reasons a presented token is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token is invalid")]
    Invalid,

    #[error("Token is expired")]
    Expired,

    #[error("Token has wrong type")]
    WrongType,

    #[error("Token is blacklisted")]
    Blacklisted,
}

/// Account and session errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("{}", INVALID_CREDENTIALS_DETAIL)]
    InvalidCredentials,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Password and password check do not match")]
    PasswordMismatch,

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Authentication credentials were not provided")]
    Unauthorized,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Token(#[from] TokenError),

    /// Sign-out was handed a refresh token that cannot be blacklisted.
    #[error("Token is invalid or expired")]
    SignOutRejected(TokenError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl AuthError {
    /// Single-field validation failure
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        AuthError::Validation(errors)
    }

    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::DuplicateEmail
            | AuthError::PasswordMismatch
            | AuthError::SignOutRejected(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::Unauthorized | AuthError::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Database(_) | AuthError::Config(_) | AuthError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AuthError::Validation(errors) => serde_json::json!(errors),
            AuthError::DuplicateEmail => serde_json::json!({
                "email": ["user with this email already exists."]
            }),
            AuthError::PasswordMismatch => serde_json::json!({
                "password": ["Password and password check do not match."]
            }),
            AuthError::SignOutRejected(_) => serde_json::json!({
                "InvalidError": "Token is invalid or expired."
            }),
            AuthError::InvalidCredentials => serde_json::json!({
                "detail": INVALID_CREDENTIALS_DETAIL
            }),
            AuthError::Unauthorized => serde_json::json!({
                "detail": self.to_string(),
                "code": "not_authenticated"
            }),
            AuthError::Token(_) => serde_json::json!({
                "detail": "Given token not valid for any token type",
                "code": "token_not_valid"
            }),
            AuthError::Forbidden => serde_json::json!({
                "detail": self.to_string(),
                "code": "permission_denied"
            }),
            AuthError::UserNotFound => serde_json::json!({
                "detail": "Not found.",
                "code": "not_found"
            }),
            AuthError::Database(_) | AuthError::Config(_) | AuthError::Internal => {
                serde_json::json!({
                    "detail": "An internal error occurred",
                    "code": "internal_error"
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AuthError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        tracing::debug!("JWT error: {:?}", err);
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        AuthError::Validation(fields)
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {:?}", err);
        AuthError::Internal
    }
}
