//! Database module for supplier-api
//!
//! This module provides database connectivity, models, and the credential
//! stores backing authentication.

pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used items
pub use models::*;
pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations, health_check};
pub use repositories::{InMemoryUserStore, PgUserStore, StoreError, UserStore};

// Re-export sqlx types that might be needed
pub use sqlx::PgPool;
