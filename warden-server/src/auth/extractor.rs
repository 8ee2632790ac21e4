//! Current user extractor

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::AppError;
use shared::rbac::Principal;

/// Caller placed in the request extensions by [`require_auth`](super::require_auth)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Principal);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.user_id
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(AppError::not_authenticated)
    }
}
