//! Shared types for warden
//!
//! Domain records, error codes and the response envelope used by the
//! authorization server and its admin clients.

pub mod error;
pub mod rbac;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
