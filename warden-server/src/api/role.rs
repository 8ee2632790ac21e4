//! Role API

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::rbac::{PageQuery, PaginatedResponse, Role, RoleCreate, RoleUpdate};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::state::AppState;
use crate::store::RepoError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/adminapi/roles", get(list))
        .route("/adminapi/role", axum::routing::post(create))
        .route("/adminapi/role/{id}", get(get_by_id).put(update))
}

/// Query filter for role listing
#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    /// Case-insensitive substring of the role name
    name: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

/// GET /adminapi/roles
async fn list(
    State(state): State<AppState>,
    Query(query): Query<RoleQuery>,
) -> AppResult<ApiResponse<PaginatedResponse<Role>>> {
    let defaults = PageQuery::default();
    let page = PageQuery::new(
        query.page.unwrap_or(defaults.page),
        query.page_size.unwrap_or(defaults.page_size),
    );
    let name = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let (roles, total) = state.store.find_roles(name, page).await?;
    Ok(ApiResponse::success(PaginatedResponse::new(roles, total, page)))
}

/// GET /adminapi/role/{id}
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Role>> {
    let role = state
        .store
        .get_role(id)
        .await?
        .ok_or(RepoError::RoleNotFound(id))?;
    Ok(ApiResponse::success(role))
}

/// POST /adminapi/role
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<RoleCreate>,
) -> AppResult<ApiResponse<Role>> {
    payload.validate()?;
    tracing::info!(user_id = user.id(), role_name = %payload.name, "Creating role");

    let role = state.store.create_role(payload, user.id()).await?;
    Ok(ApiResponse::success(role))
}

/// PUT /adminapi/role/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<RoleUpdate>,
) -> AppResult<ApiResponse<Role>> {
    payload.validate()?;
    tracing::info!(
        user_id = user.id(),
        role_id = id,
        permissions = payload.permission_ids.len(),
        "Updating role"
    );

    let role = state.store.update_role(id, payload).await?;
    Ok(ApiResponse::success(role))
}
