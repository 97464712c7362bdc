//! Authorization middleware
//!
//! Role guards that sit in front of route groups. A guard pulls the bearer
//! token from the `Authorization` header, verifies it, checks the role and
//! hands an [`AuthContext`] to the handler through the request extensions.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::api::AppState;
use super::jwt::Claims;
use super::service::AuthError;
use crate::core::db::models::Role;

/// Set on guarded responses when the presented token is close to expiry
pub const TOKEN_REFRESH_HEADER: &str = "x-token-refresh";

/// Minimum role a route group requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRole {
    Admin,
    Manager,
}

impl RequiredRole {
    /// Admins pass every guard, managers only the manager guard
    pub fn is_satisfied_by(self, role: Role) -> bool {
        match (self, role) {
            (_, Role::Admin) => true,
            (RequiredRole::Manager, Role::Manager) => true,
            (RequiredRole::Admin, Role::Manager) => false,
        }
    }
}

/// Verified identity of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    claims: Claims,
}

impl AuthContext {
    pub fn new(claims: Claims) -> Self {
        Self { claims }
    }

    pub fn user_id(&self) -> Uuid {
        self.claims.user_id()
    }

    pub fn role(&self) -> Role {
        self.claims.role()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    /// Record-level check: admins reach every user, everyone else only themselves
    pub fn can_access(&self, user_id: Uuid) -> bool {
        self.is_admin() || self.user_id() == user_id
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present behind a guard
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The header must split on spaces into exactly two parts and the scheme is
/// matched case-insensitively.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::Unauthorized)?
        .to_str()
        .map_err(|_| AuthError::Unauthorized)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(AuthError::Unauthorized),
    }
}

async fn guard(
    state: &AppState,
    required: RequiredRole,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer_token(request.headers()).inspect_err(|_| {
        tracing::debug!("Rejected {}: missing or malformed bearer", request.uri().path());
    })?;

    let verified = state.auth.tokens().verify(token).map_err(|e| {
        tracing::debug!("Rejected {}: {}", request.uri().path(), e);
        AuthError::Unauthorized
    })?;

    if !required.is_satisfied_by(verified.claims.role()) {
        tracing::info!(
            "User {} with role {} denied access to {}",
            verified.claims.user_id(),
            verified.claims.role(),
            request.uri().path()
        );
        return Err(AuthError::Forbidden);
    }

    request
        .extensions_mut()
        .insert(AuthContext::new(verified.claims));

    let mut response = next.run(request).await;
    if verified.needs_refresh {
        response
            .headers_mut()
            .insert(TOKEN_REFRESH_HEADER, HeaderValue::from_static("true"));
    }

    Ok(response)
}

/// Guard for admin-only routes
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    guard(&state, RequiredRole::Admin, request, next).await
}

/// Guard for routes open to managers and admins
pub async fn require_manager(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    guard(&state, RequiredRole::Manager, request, next).await
}
