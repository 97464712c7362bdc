//! Token lifecycle: issuance, verification with sliding renewal, and renewal
//! from a refresh token.
//!
//! Access tokens are short-lived (15 minutes), refresh tokens are long-lived
//! (12 hours). A token is flagged for renewal once less than a fixed share
//! (default 20%) of its validity window remains.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::auth::jwt::{Claims, JwtCodec, TokenError};
use crate::core::db::models::{Role, User};

/// Default access token expiration time (15 minutes)
pub const ACCESS_TOKEN_EXPIRATION_MINUTES: i64 = 15;

/// Default refresh token expiration time (12 hours)
pub const REFRESH_TOKEN_EXPIRATION_HOURS: i64 = 12;

/// Default share of the validity window below which a token needs renewal
pub const DEFAULT_REFRESH_RATIO: f64 = 0.2;

/// Token lifecycle configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Access token expiration in minutes
    pub access_token_expiration_minutes: i64,
    /// Refresh token expiration in hours
    pub refresh_token_expiration_hours: i64,
    /// Remaining-lifetime ratio that triggers renewal
    pub refresh_ratio: f64,
}

impl TokenConfig {
    /// Create a new token configuration with default lifetimes
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiration_minutes: ACCESS_TOKEN_EXPIRATION_MINUTES,
            refresh_token_expiration_hours: REFRESH_TOKEN_EXPIRATION_HOURS,
            refresh_ratio: DEFAULT_REFRESH_RATIO,
        }
    }

    /// Set access token expiration
    pub fn access_token_expiration(mut self, minutes: i64) -> Self {
        self.access_token_expiration_minutes = minutes;
        self
    }

    /// Set refresh token expiration
    pub fn refresh_token_expiration(mut self, hours: i64) -> Self {
        self.refresh_token_expiration_hours = hours;
        self
    }

    /// Set renewal ratio
    pub fn refresh_ratio(mut self, ratio: f64) -> Self {
        self.refresh_ratio = ratio;
        self
    }

    /// Validity window for tokens of `kind`, `None` when the configured
    /// value does not fit a `Duration`
    pub fn lifetime(&self, kind: TokenKind) -> Option<Duration> {
        match kind {
            TokenKind::Access => Duration::try_minutes(self.access_token_expiration_minutes),
            TokenKind::Refresh => Duration::try_hours(self.refresh_token_expiration_hours),
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field(
                "access_token_expiration_minutes",
                &self.access_token_expiration_minutes,
            )
            .field(
                "refresh_token_expiration_hours",
                &self.refresh_token_expiration_hours,
            )
            .field("refresh_ratio", &self.refresh_ratio)
            .finish()
    }
}

/// Token kind enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Token pair (access + refresh)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,
    /// Refresh token (long-lived)
    pub refresh_token: String,
}

/// Outcome of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub claims: Claims,
    /// The token is inside the trailing part of its window and should be renewed
    pub needs_refresh: bool,
}

/// `true` when `exp - now < ratio * (exp - iat)`
pub fn needs_refresh(claims: &Claims, now: DateTime<Utc>, ratio: f64) -> bool {
    let remaining = (claims.expires_at() - now.timestamp()) as f64;
    let threshold = ratio * claims.lifetime_secs() as f64;
    remaining < threshold
}

/// Issues, verifies and renews tokens
#[derive(Clone)]
pub struct TokenManager {
    codec: JwtCodec,
    config: TokenConfig,
}

impl TokenManager {
    /// Create a token manager; the codec is keyed with `config.secret`
    pub fn new(config: TokenConfig) -> Self {
        Self {
            codec: JwtCodec::new(config.secret.as_bytes()),
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn ttl(&self, kind: TokenKind) -> Result<Duration, TokenError> {
        self.config
            .lifetime(kind)
            .ok_or_else(|| TokenError::Encoding(format!("{:?} token lifetime out of range", kind)))
    }

    /// Mint a single token of `kind` for a subject, issued at `now`
    pub fn mint(
        &self,
        user_id: Uuid,
        role: Role,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims::new(user_id, role, now, self.ttl(kind)?)?;
        self.codec.encode(&claims)
    }

    /// Issue an access/refresh pair for a user
    pub fn issue(&self, user: &User) -> Result<TokenPair, TokenError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a pair as if the current time were `now`. Both tokens share the
    /// same issue instant; if either fails to encode, neither is returned.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        let access_token = self.mint(user.id, user.role, TokenKind::Access, now)?;
        let refresh_token = self.mint(user.id, user.role, TokenKind::Refresh, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token and compute the renewal flag against `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, TokenError> {
        let claims = self.codec.decode(token)?;

        // The codec already rejects expired tokens; check again with our clock
        if now.timestamp() >= claims.expires_at() {
            return Err(TokenError::Expired);
        }

        let needs_refresh = needs_refresh(&claims, now, self.config.refresh_ratio);

        Ok(VerifiedToken {
            claims,
            needs_refresh,
        })
    }

    /// Renew tokens for an already loaded `user` from `refresh_token`.
    ///
    /// The refresh token's subject must be `user`. When the refresh token is
    /// itself due for renewal both tokens rotate; otherwise only a new access
    /// token is minted and the refresh token is returned unchanged.
    pub fn renew_for(&self, user: &User, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let verified = self.verify(refresh_token)?;

        if verified.claims.user_id() != user.id {
            return Err(TokenError::SubjectMismatch);
        }

        if verified.needs_refresh {
            return self.issue(user);
        }

        let access_token = self.mint(user.id, user.role, TokenKind::Access, Utc::now())?;

        Ok(TokenPair {
            access_token,
            refresh_token: refresh_token.to_string(),
        })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
