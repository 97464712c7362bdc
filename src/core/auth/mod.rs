//! Authentication and authorization for supplier-api
//!
//! This module provides:
//! - Password hashing and verification (bcrypt)
//! - HS256 token encoding and decoding
//! - Token issuance, verification and renewal
//! - Role guards and the request auth context
//! - REST API endpoints for login and user administration

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod tokens;

pub use api::{ApiError, AppState, api_router};
pub use jwt::{Claims, JwtCodec, TokenError};
pub use middleware::{AuthContext, RequiredRole, extract_bearer_token, require_admin, require_manager};
pub use password::{PasswordError, PasswordHasher};
pub use service::{AuthError, AuthService, LoginRequest};
pub use tokens::{TokenConfig, TokenKind, TokenManager, TokenPair, VerifiedToken};
