//! Caller self queries

use std::collections::BTreeMap;

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::rbac::Principal;

use crate::auth::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/adminapi/auth/permissions", get(check_codes))
        .route("/adminapi/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct CodesQuery {
    /// Comma separated full codes, `admin.user.create,admin.role.menu`
    #[serde(default)]
    codes: String,
}

fn split_codes(raw: &str) -> Vec<String> {
    let mut codes: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    codes.dedup();
    codes
}

/// GET /adminapi/auth/permissions?codes=
async fn check_codes(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<CodesQuery>,
) -> AppResult<ApiResponse<BTreeMap<String, bool>>> {
    let codes = split_codes(&query.codes);
    let decisions = state
        .authorizer
        .check_permissions_by_full_code(&user.0, &codes)
        .await?;
    Ok(ApiResponse::success(decisions))
}

/// GET /adminapi/auth/me
async fn me(user: CurrentUser) -> ApiResponse<Principal> {
    ApiResponse::success(user.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_codes() {
        assert_eq!(
            split_codes(" admin.user.create, ,admin.role.menu,"),
            vec!["admin.user.create", "admin.role.menu"]
        );
        assert!(split_codes("").is_empty());
    }
}
