//! Api registry API

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::rbac::{Api, ApiCreate, ApiUpdate, PageQuery, PaginatedResponse, RouteInfo};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::state::AppState;
use crate::store::ApiFilter;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/adminapi/system/apis", get(list))
        .route("/adminapi/system/api", post(create))
        .route("/adminapi/system/api/{id}", put(update).delete(delete))
        .route("/adminapi/system/routes", get(routes))
}

#[derive(Debug, Deserialize)]
pub struct ApiQuery {
    method: Option<String>,
    /// Path prefix
    path: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    path: Option<String>,
    method: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET /adminapi/system/apis
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ApiQuery>,
) -> AppResult<ApiResponse<PaginatedResponse<Api>>> {
    let defaults = PageQuery::default();
    let page = PageQuery::new(
        query.page.unwrap_or(defaults.page),
        query.page_size.unwrap_or(defaults.page_size),
    );
    let filter = ApiFilter {
        method: non_blank(query.method),
        path_prefix: non_blank(query.path),
    };

    let (apis, total) = state.registry.find(&filter, page).await?;
    Ok(ApiResponse::success(PaginatedResponse::new(apis, total, page)))
}

/// POST /adminapi/system/api
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ApiCreate>,
) -> AppResult<ApiResponse<Api>> {
    payload.validate()?;
    tracing::info!(
        user_id = user.id(),
        method = %payload.method,
        path = %payload.path,
        "Binding api"
    );

    let api = state.registry.create(payload, user.id()).await?;
    Ok(ApiResponse::success(api))
}

/// PUT /adminapi/system/api/{id}
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ApiUpdate>,
) -> AppResult<ApiResponse<Api>> {
    payload.validate()?;
    tracing::info!(user_id = user.id(), api_id = id, "Updating api binding");

    let api = state.registry.update(id, payload).await?;
    Ok(ApiResponse::success(api))
}

/// DELETE /adminapi/system/api/{id}
async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<()>> {
    state.registry.delete(id).await?;
    tracing::info!(user_id = user.id(), api_id = id, "Deleted api binding");
    Ok(ApiResponse::ok())
}

/// GET /adminapi/system/routes
async fn routes(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> ApiResponse<Vec<RouteInfo>> {
    ApiResponse::success(
        state
            .registry
            .routes(query.path.as_deref(), query.method.as_deref()),
    )
}
