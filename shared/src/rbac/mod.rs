//! RBAC data models
//!
//! Shared between warden-server and admin front-ends (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (PostgreSQL BIGSERIAL).

pub mod api;
pub mod page;
pub mod permission;
pub mod principal;
pub mod role;

// Re-exports
pub use api::*;
pub use page::*;
pub use permission::*;
pub use principal::*;
pub use role::*;
