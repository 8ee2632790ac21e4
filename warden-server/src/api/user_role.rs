//! User role assignment API

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use shared::error::{ApiResponse, AppResult};
use shared::rbac::{Role, UserRolesReplace};

use crate::auth::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/adminapi/user/{id}/roles", get(list).put(replace))
}

/// GET /adminapi/user/{id}/roles
async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<ApiResponse<Vec<Role>>> {
    Ok(ApiResponse::success(
        state.store.list_roles_for_user(user_id).await?,
    ))
}

/// PUT /adminapi/user/{id}/roles
///
/// Replaces the whole assignment, an empty list revokes every role.
async fn replace(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<i64>,
    Json(payload): Json<UserRolesReplace>,
) -> AppResult<ApiResponse<Vec<Role>>> {
    tracing::info!(
        user_id = user.id(),
        target_user_id = user_id,
        role_ids = ?payload.role_ids,
        "Replacing user roles"
    );

    state
        .store
        .replace_roles_for_user(user_id, &payload.role_ids)
        .await?;
    Ok(ApiResponse::success(
        state.store.list_roles_for_user(user_id).await?,
    ))
}
