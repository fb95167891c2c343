//! Session Service
//!
//! Coordinates the credential store, password hasher, token service and
//! revocation ledger for sign-up, sign-in, sign-out and withdrawal. All input
//! validation happens before anything is written.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::ledger::RevocationLedger;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::store::{RevocationStore, UserStore};
use crate::token::TokenService;

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use validator::Validate;

/// Account and session orchestrator
pub struct SessionService {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
    ledger: RevocationLedger,
}

impl SessionService {
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let hasher = PasswordHasher::new(&config)?;
        let tokens = Arc::new(TokenService::new(&config));
        let ledger = RevocationLedger::new(revocations, tokens.clone());

        Ok(Self {
            config,
            users,
            hasher,
            tokens,
            ledger,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn ledger(&self) -> &RevocationLedger {
        &self.ledger
    }

    // ============================================
    // Sign-up
    // ============================================

    /// Register a new account. No tokens are issued.
    pub async fn sign_up(&self, req: SignUpRequest) -> Result<User, AuthError> {
        req.validate()?;

        // Fast path only; the store's unique constraint is the final arbiter.
        if self.users.find_by_email(&req.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        if req.password != req.password_check {
            return Err(AuthError::PasswordMismatch);
        }

        let password_hash = self.hasher.hash(&req.password).await?;

        let user = self
            .users
            .create_user(NewUser {
                email: req.email,
                name: req.name,
                gender: req.gender,
                birth_date: req.birth_date,
                password_hash,
                is_staff: false,
            })
            .await?;

        tracing::info!(user_id = user.id, email = %user.email, "User signed up");
        Ok(user)
    }

    /// Create an active staff account
    pub async fn create_superuser(
        &self,
        email: &str,
        name: &str,
        password: &str,
        gender: Gender,
        birth_date: NaiveDate,
    ) -> Result<User, AuthError> {
        if email.is_empty() {
            return Err(AuthError::field("email", "Users must have an email address"));
        }
        if name.is_empty() {
            return Err(AuthError::field("name", "Users must have a name"));
        }
        if password.is_empty() {
            return Err(AuthError::field("password", "This field may not be blank."));
        }

        let password_hash = self.hasher.hash(password).await?;

        let user = self
            .users
            .create_user(NewUser {
                email: email.to_string(),
                name: name.to_string(),
                gender,
                birth_date,
                password_hash,
                is_staff: true,
            })
            .await?;

        tracing::info!(user_id = user.id, email = %user.email, "Superuser created");
        Ok(user)
    }

    // ============================================
    // Sign-in / Sign-out
    // ============================================

    /// Check credentials and mint a fresh token pair
    ///
    /// Unknown email, inactive account and wrong password are indistinguishable.
    pub async fn sign_in(&self, req: SignInRequest) -> Result<SignInResponse, AuthError> {
        req.validate()?;

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            // Spend the same hashing work as a real check.
            self.hasher.hash(&req.password).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(&req.password, &user.password_hash).await? {
            tracing::debug!(user_id = user.id, "Sign-in rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.can_login() {
            tracing::debug!(user_id = user.id, "Sign-in rejected: inactive account");
            return Err(AuthError::InvalidCredentials);
        }

        self.users.touch_last_login(user.id, Utc::now()).await?;

        let token = self.tokens.issue(&user)?;

        tracing::info!(user_id = user.id, "User signed in");
        Ok(SignInResponse {
            user: user.email,
            token,
        })
    }

    /// Blacklist the refresh token of a session
    ///
    /// The access token is required but not revoked; it stays valid until it
    /// expires.
    pub async fn sign_out(&self, req: SignOutRequest) -> Result<(), AuthError> {
        req.validate()?;

        let claims = self
            .ledger
            .verify_refresh(&req.refresh)
            .await
            .map_err(sign_out_rejection)?;

        self.ledger
            .blacklist(&req.refresh)
            .await
            .map_err(sign_out_rejection)?;

        tracing::info!(user_id = %claims.sub, "User signed out");
        Ok(())
    }

    /// Exchange a refresh token for a new access token without rotating it
    pub async fn refresh_access(&self, req: RefreshRequest) -> Result<AccessResponse, AuthError> {
        req.validate()?;

        let claims = self.ledger.verify_refresh(&req.refresh).await?;
        let access = self.tokens.mint(claims.user_id()?, TokenType::Access)?;

        Ok(AccessResponse { access })
    }

    // ============================================
    // Authenticated operations
    // ============================================

    /// Verify an access token presented with a request
    pub fn authenticate(&self, access: &str) -> Result<Claims, AuthError> {
        Ok(self.tokens.verify(access, TokenType::Access)?)
    }

    /// Profile of the token holder
    pub async fn current_user(&self, caller: &Claims) -> Result<User, AuthError> {
        self.users
            .find_by_id(caller.user_id()?)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Delete the account `id`
    ///
    /// Any authenticated caller may delete any account unless
    /// `withdraw_self_only` is set, in which case only the owner or staff can.
    pub async fn withdraw(&self, caller: &Claims, id: i64) -> Result<(), AuthError> {
        let caller_id = caller.user_id()?;

        if self.config.withdraw_self_only && caller_id != id {
            let is_staff = self
                .users
                .find_by_id(caller_id)
                .await?
                .is_some_and(|u| u.is_staff && u.is_active);
            if !is_staff {
                tracing::warn!(caller_id, target_id = id, "Withdrawal of another account denied");
                return Err(AuthError::Forbidden);
            }
        }

        self.users.delete_user(id).await?;

        tracing::info!(caller_id, user_id = id, "User withdrawn");
        Ok(())
    }
}

fn sign_out_rejection(err: AuthError) -> AuthError {
    match err {
        AuthError::Token(reason) => AuthError::SignOutRejected(reason),
        other => other,
    }
}
