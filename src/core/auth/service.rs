//! Authentication service
//!
//! Provides business logic for login, token renewal and user administration.
//! Coordinates between the credential store, the password hasher and the
//! token lifecycle manager.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::core::auth::jwt::TokenError;
use crate::core::auth::middleware::AuthContext;
use crate::core::auth::password::{PasswordError, PasswordHasher};
use crate::core::auth::tokens::{TokenManager, TokenPair};
use crate::core::db::models::{CreateUser, Role, UpdateUser, User};
use crate::core::db::repositories::{StoreError, UserStore};
use crate::core::validation::{self, ValidationError};

/// Default upper bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Insufficient role")]
    Forbidden,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::UserNotFound,
            StoreError::EmailAlreadyExists => AuthError::EmailAlreadyExists,
            _ => AuthError::Store(err),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::CredentialMismatch => AuthError::InvalidCredentials,
            PasswordError::HashingError(msg) => AuthError::InternalError(msg),
        }
    }
}

/// Login request data
#[derive(Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: TokenManager,
    hasher: PasswordHasher,
    store_timeout: Duration,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenManager, hasher: PasswordHasher) -> Self {
        Self {
            store,
            tokens,
            hasher,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Set the upper bound on a single store call
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Run a store call, failing with `StoreError::Timeout` past the deadline
    async fn timed<T, F>(&self, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::Store(StoreError::Timeout)),
        }
    }

    async fn find_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.timed(self.store.find_by_id(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Exchange credentials for a token pair.
    ///
    /// Unknown email and wrong password fail identically, and both spend one
    /// bcrypt verification.
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair, AuthError> {
        let Some(user) = self.timed(self.store.find_by_email(&request.email)).await? else {
            self.hasher.verify_dummy(&request.password);
            tracing::info!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if let Err(e) = self.hasher.verify(&user.password_hash, &request.password) {
            tracing::info!("Login failed for user {}", user.id);
            return Err(e.into());
        }

        let tokens = self.tokens.issue(&user)?;
        tracing::info!("User {} logged in", user.id);

        Ok(tokens)
    }

    /// Register a new user. Validation runs before any store access.
    pub async fn register(&self, request: CreateUser) -> Result<User, AuthError> {
        validation::validate_email(&request.email)?;
        validation::validate_first_name(&request.first_name)?;
        validation::validate_last_name(&request.last_name)?;
        validation::validate_password(&request.password)?;
        let role = validation::validate_role(&request.role)?;

        if self.timed(self.store.email_exists(&request.email)).await? {
            return Err(AuthError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: request.email,
            password_hash: self.hasher.hash(&request.password)?,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            role,
            created_at: now,
            updated_at: now,
            claims: None,
        };

        // The store enforces uniqueness again; a concurrent insert surfaces here
        self.timed(self.store.insert(&user)).await?;
        tracing::info!("Registered user {} with role {}", user.id, user.role);

        Ok(user)
    }

    /// Renew tokens for `user_id` with a refresh token.
    ///
    /// The user must exist and be the token's subject. The renewed tokens
    /// carry the user's current role.
    pub async fn renew(&self, user_id: Uuid, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let user = self.find_user(user_id).await?;

        let tokens = self.tokens.renew_for(&user, refresh_token).map_err(|e| {
            tracing::warn!("Token renewal rejected for user {}: {}", user_id, e);
            e
        })?;

        if tokens.refresh_token == refresh_token {
            tracing::info!("Renewed access token for user {}", user_id);
        } else {
            tracing::info!("Rotated token pair for user {}", user_id);
        }

        Ok(tokens)
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.find_user(user_id).await
    }

    /// The caller's own record, with the claims they authenticated with
    pub async fn current_user(&self, ctx: &AuthContext) -> Result<User, AuthError> {
        let user = self.find_user(ctx.user_id()).await?;
        Ok(user.with_claims(ctx.claims().clone()))
    }

    /// List all users
    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        self.timed(self.store.list()).await
    }

    /// Apply a partial update. Provided fields are validated as on
    /// registration; a new password is re-hashed.
    pub async fn update_user(&self, user_id: Uuid, update: UpdateUser) -> Result<User, AuthError> {
        let mut user = self.find_user(user_id).await?;

        if let Some(email) = update.email {
            validation::validate_email(&email)?;
            user.email = email;
        }
        if let Some(first_name) = update.first_name {
            validation::validate_first_name(&first_name)?;
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = update.last_name {
            validation::validate_last_name(&last_name)?;
            user.last_name = last_name.trim().to_string();
        }
        if let Some(role) = update.role {
            user.role = validation::validate_role(&role)?;
        }
        if let Some(password) = update.password {
            validation::validate_password(&password)?;
            user.password_hash = self.hasher.hash(&password)?;
        }

        user.updated_at = Utc::now();
        self.timed(self.store.update(&user)).await?;
        tracing::info!("Updated user {}", user.id);

        Ok(user)
    }

    /// Delete a user
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        if !self.timed(self.store.delete(user_id)).await? {
            return Err(AuthError::UserNotFound);
        }

        tracing::info!("Deleted user {}", user_id);
        Ok(())
    }

    /// Seed an admin account when the store holds no users at all.
    /// Returns the created user, or `None` if the store was not empty.
    pub async fn ensure_bootstrap_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        if self.timed(self.store.count()).await? > 0 {
            return Ok(None);
        }

        let admin = self
            .register(CreateUser {
                email: email.to_string(),
                password: password.to_string(),
                first_name: "Admin".to_string(),
                last_name: "Admin".to_string(),
                role: Role::Admin.as_str().to_string(),
            })
            .await?;

        tracing::info!("Created bootstrap admin {}", admin.id);
        Ok(Some(admin))
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .field("hasher", &self.hasher)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}
