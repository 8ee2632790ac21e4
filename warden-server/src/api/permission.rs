//! Permission tree API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /adminapi/system/permissions?parent_id= | GET | 子树 (默认全部) |
//! | /adminapi/system/permission | POST | 创建 |
//! | /adminapi/system/permission/{id} | GET | 祖先链 (根在前) |
//! | /adminapi/system/permission/{id} | PUT | 修改 / 移动 |
//! | /adminapi/system/permission/{id} | DELETE | 级联删除 |
//! | /adminapi/system/permission/{id}/children | GET | 直接子节点 |
//! | /adminapi/system/permission/{id}/sort | PUT | 同级排序 |

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppResult};
use shared::rbac::{
    Permission, PermissionCreate, PermissionReorder, PermissionUpdate, ROOT_PARENT_ID, TreeNode,
};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/adminapi/system/permissions", get(subtree))
        .route("/adminapi/system/permission", post(create))
        .route(
            "/adminapi/system/permission/{id}",
            get(ancestors).put(update).delete(delete),
        )
        .route("/adminapi/system/permission/{id}/children", get(children))
        .route("/adminapi/system/permission/{id}/sort", put(reorder))
}

#[derive(Debug, Deserialize)]
pub struct SubtreeQuery {
    parent_id: Option<i64>,
}

/// Ids removed by a cascading delete
#[derive(Debug, Serialize)]
pub struct DeletedPermissions {
    pub ids: Vec<i64>,
}

/// GET /adminapi/system/permissions
async fn subtree(
    State(state): State<AppState>,
    Query(query): Query<SubtreeQuery>,
) -> AppResult<ApiResponse<Vec<TreeNode>>> {
    let parent_id = query.parent_id.unwrap_or(ROOT_PARENT_ID);
    Ok(ApiResponse::success(state.store.list_subtree(parent_id).await?))
}

/// GET /adminapi/system/permission/{id}
async fn ancestors(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Vec<Permission>>> {
    Ok(ApiResponse::success(state.store.list_ancestors(id).await?))
}

/// GET /adminapi/system/permission/{id}/children
async fn children(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<Vec<Permission>>> {
    Ok(ApiResponse::success(state.store.list_children(id).await?))
}

/// POST /adminapi/system/permission
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<PermissionCreate>,
) -> AppResult<ApiResponse<Permission>> {
    payload.validate()?;
    tracing::info!(
        user_id = user.id(),
        parent_id = payload.parent_id,
        code = %payload.code,
        "Creating permission"
    );

    let permission = state.store.create_permission(payload, user.id()).await?;
    Ok(ApiResponse::success(permission))
}

/// PUT /adminapi/system/permission/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PermissionUpdate>,
) -> AppResult<ApiResponse<Permission>> {
    payload.validate()?;
    tracing::info!(
        user_id = user.id(),
        permission_id = id,
        parent_id = payload.parent_id,
        "Updating permission"
    );

    let permission = state.store.update_permission(id, payload).await?;
    Ok(ApiResponse::success(permission))
}

/// PUT /adminapi/system/permission/{id}/sort
async fn reorder(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<PermissionReorder>,
) -> AppResult<ApiResponse<Permission>> {
    payload.validate()?;
    tracing::info!(
        user_id = user.id(),
        permission_id = id,
        sort = payload.sort,
        "Reordering permission"
    );

    let permission = state.store.reorder_permission(id, payload.sort).await?;
    Ok(ApiResponse::success(permission))
}

/// DELETE /adminapi/system/permission/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<DeletedPermissions>> {
    let ids = state.store.delete_permission(id).await?;
    tracing::info!(
        user_id = user.id(),
        permission_id = id,
        removed = ids.len(),
        "Deleted permission subtree"
    );
    Ok(ApiResponse::success(DeletedPermissions { ids }))
}
