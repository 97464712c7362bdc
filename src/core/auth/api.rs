//! User API endpoints
//!
//! Provides REST API endpoints for authentication and user administration:
//! - GET /health - Liveness probe
//! - POST /users/login - Exchange credentials for tokens
//! - POST /users/{id}/renew-token - Renew tokens with a refresh token
//! - GET /users/me - Current user (manager or admin)
//! - POST /users, GET /users - Register / list users (admin)
//! - GET /users/{id} - Read a user (admin, or a manager reading themselves)
//! - PUT, DELETE /users/{id} - Manage a user (admin)

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;
use uuid::Uuid;

use crate::core::auth::middleware::{AuthContext, extract_bearer_token, require_admin, require_manager};
use crate::core::auth::service::{AuthError, AuthService, LoginRequest};
use crate::core::auth::tokens::TokenPair;
use crate::core::db::models::{CreateUser, UpdateUser, UserResponse};

/// Shared state for the API router
#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: AuthService,
}

impl AppState {
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    /// Offending request field, for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }
}

/// Convert AuthError to API response.
///
/// Every authentication and authorization failure collapses to a bare 401;
/// the specific reason only reaches the logs.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AuthError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ApiError::new(e.to_string(), "VALIDATION_ERROR").with_field(e.field()),
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ApiError::new(self.to_string(), "INVALID_CREDENTIALS"),
            ),
            AuthError::UserNotFound => (
                StatusCode::NOT_FOUND,
                ApiError::new(self.to_string(), "USER_NOT_FOUND"),
            ),
            AuthError::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                ApiError::new(self.to_string(), "EMAIL_EXISTS"),
            ),
            AuthError::Unauthorized | AuthError::Forbidden | AuthError::Token(_) => {
                tracing::debug!("Request rejected: {}", self);
                (
                    StatusCode::UNAUTHORIZED,
                    ApiError::new("Unauthorized", "UNAUTHORIZED"),
                )
            }
            AuthError::Store(_) | AuthError::InternalError(_) => {
                tracing::error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("Internal server error", "INTERNAL_ERROR"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Response for deletions
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response for the liveness probe
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Create the API router
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/users/login", post(login_handler))
        .route("/users/{id}/renew-token", post(renew_token_handler))
        .route(
            "/users/me",
            get(me_handler).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_manager,
            )),
        )
        .route(
            "/users",
            post(create_user_handler)
                .get(list_users_handler)
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        )
        .route(
            "/users/{id}",
            get(get_user_handler).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_manager,
            )),
        )
        .route(
            "/users/{id}",
            put(update_user_handler)
                .delete(delete_user_handler)
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        )
        .with_state(state)
}

/// Path ids that are not UUIDs cannot name a user
fn parse_user_id(id: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(id).map_err(|_| AuthError::UserNotFound)
}

/// GET /health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// POST /users/login
async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let tokens = state.auth.login(request).await?;
    Ok(Json(tokens))
}

/// POST /users/{id}/renew-token
/// The refresh token is presented as the bearer credential
async fn renew_token_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TokenPair>, AuthError> {
    let refresh_token = extract_bearer_token(&headers)?;
    let user_id = parse_user_id(&id).map_err(|_| AuthError::Unauthorized)?;

    let tokens = state
        .auth
        .renew(user_id, refresh_token)
        .await
        .map_err(|e| match e {
            AuthError::UserNotFound => AuthError::Unauthorized,
            other => other,
        })?;

    Ok(Json(tokens))
}

/// GET /users/me
async fn me_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state.auth.current_user(&ctx).await?;
    Ok(Json(user.into()))
}

/// POST /users
async fn create_user_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(request): Json<CreateUser>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    tracing::info!("Admin {} registering a {} account", ctx.user_id(), request.role);

    let user = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users
async fn list_users_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AuthError> {
    let users = state.auth.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /users/{id}
/// Managers may only read their own record
async fn get_user_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AuthError> {
    let user_id = parse_user_id(&id)?;
    if !ctx.can_access(user_id) {
        return Err(AuthError::Forbidden);
    }

    let user = state.auth.get_user(user_id).await?;
    Ok(Json(user.into()))
}

/// PUT /users/{id}
async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUser>,
) -> Result<Json<UserResponse>, AuthError> {
    let user_id = parse_user_id(&id)?;
    let user = state.auth.update_user(user_id, request).await?;
    Ok(Json(user.into()))
}

/// DELETE /users/{id}
async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AuthError> {
    let user_id = parse_user_id(&id)?;
    state.auth.delete_user(user_id).await?;

    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}
