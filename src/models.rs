//! Account Models
//!
//! Data structures for account requests, responses, database entities and
//! JWT claims.

use crate::error::{AuthError, TokenError};
use crate::form::{FormFields, NOT_A_STRING};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// Gender enum matching database type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_gender")]
pub enum Gender {
    #[sqlx(rename = "M")]
    #[serde(rename = "M", alias = "Male")]
    Male,
    #[sqlx(rename = "F")]
    #[serde(rename = "F", alias = "Female")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" | "Male" => Ok(Gender::Male),
            "F" | "Female" => Ok(Gender::Female),
            other => Err(format!("\"{other}\" is not a valid choice.")),
        }
    }
}

/// User entity from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Inactive accounts cannot sign in
    pub fn can_login(&self) -> bool {
        self.is_active
    }
}

/// Fields required to insert a user; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub password_hash: String,
    pub is_staff: bool,
}

/// Blacklisted refresh token entity from database
#[derive(Debug, Clone, FromRow)]
pub struct BlacklistedToken {
    pub jti: Uuid,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub blacklisted_at: DateTime<Utc>,
}

// ============================================
// Request DTOs
// ============================================

/// Sign-up request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 40, message = "Ensure this field has no more than 40 characters.")
    )]
    pub email: String,

    #[validate(length(min = 1, max = 30, message = "Name must be 1-30 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password_check: String,

    pub gender: Gender,

    pub birth_date: NaiveDate,
}

/// Sign-in request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub email: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Sign-out request, populated from the `access` and `refresh` cookies
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SignOutRequest {
    #[validate(length(min = 1, message = "This field is required."))]
    pub access: String,

    #[validate(length(min = 1, message = "This field is required."))]
    pub refresh: String,
}

/// Access token refresh request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "This field is required."))]
    pub refresh: String,
}

impl TryFrom<serde_json::Value> for SignUpRequest {
    type Error = AuthError;

    fn try_from(body: serde_json::Value) -> Result<Self, AuthError> {
        let mut form = FormFields::new(body)?;
        let fields = (
            form.required("email", NOT_A_STRING),
            form.required("name", NOT_A_STRING),
            form.required("password", NOT_A_STRING),
            form.required("password_check", NOT_A_STRING),
            form.required("gender", "Select a valid choice: M or F."),
            form.required(
                "birth_date",
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
            ),
        );

        let (
            Some(email),
            Some(name),
            Some(password),
            Some(password_check),
            Some(gender),
            Some(birth_date),
        ) = fields
        else {
            return Err(form.into_error());
        };

        Ok(Self {
            email,
            name,
            password,
            password_check,
            gender,
            birth_date,
        })
    }
}

impl TryFrom<serde_json::Value> for SignInRequest {
    type Error = AuthError;

    fn try_from(body: serde_json::Value) -> Result<Self, AuthError> {
        let mut form = FormFields::new(body)?;
        let fields = (
            form.required("email", NOT_A_STRING),
            form.required("password", NOT_A_STRING),
        );

        let (Some(email), Some(password)) = fields else {
            return Err(form.into_error());
        };

        Ok(Self { email, password })
    }
}

impl TryFrom<serde_json::Value> for RefreshRequest {
    type Error = AuthError;

    fn try_from(body: serde_json::Value) -> Result<Self, AuthError> {
        let mut form = FormFields::new(body)?;

        let Some(refresh) = form.required("refresh", NOT_A_STRING) else {
            return Err(form.into_error());
        };

        Ok(Self { refresh })
    }
}

// ============================================
// Response DTOs
// ============================================

/// User response (public user data without the password hash)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            gender: user.gender,
            birth_date: user.birth_date,
            is_active: user.is_active,
            is_staff: user.is_staff,
            date_joined: user.date_joined,
            updated_at: user.updated_at,
            last_login: user.last_login,
        }
    }
}

/// Signed access/refresh pair minted at sign-in
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Sign-in response
#[derive(Debug, Clone, Serialize)]
pub struct SignInResponse {
    /// Email of the signed-in user
    pub user: String,
    pub token: TokenPair,
}

/// Response of the access refresh endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    pub access: String,
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================
// JWT Claims
// ============================================

/// Discriminates access from refresh tokens so one cannot stand in for the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Access or refresh
    pub token_type: TokenType,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// JWT ID (unique identifier, keys the blacklist)
    pub jti: Uuid,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

impl Claims {
    /// Numeric user id carried in `sub`
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Invalid)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}
