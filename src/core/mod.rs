//! Core domain: configuration, credential storage, validation and auth

pub mod auth;
pub mod config;
pub mod db;
pub mod validation;
