//! Credential store implementations
//!
//! Stores encapsulate data access and give the auth service a single trait
//! to talk to, whether records live in PostgreSQL or in process memory.

pub mod memory;
pub mod user;

pub use memory::InMemoryUserStore;
pub use user::{PgUserStore, StoreError, UserStore};
