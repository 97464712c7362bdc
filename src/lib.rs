//! supplier-api - authentication and authorization core
//!
//! Credential storage, token lifecycle and role guards for the supplier
//! management HTTP API, built on axum.

pub mod core;
