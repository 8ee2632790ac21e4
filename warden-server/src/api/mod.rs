//! HTTP API
//!
//! # 路由分组
//!
//! | 分组 | 守卫 |
//! |------|------|
//! | `/health` | 无 |
//! | `/adminapi/system/*` | require_auth → require_superuser |
//! | other `/adminapi/*` | require_auth → require_permission |
//!
//! Guards are attached with `route_layer` and every guarded route is
//! declared with its full template, so [`MatchedPath`](axum::extract::MatchedPath)
//! is exactly the path stored in the api registry.

mod apis;
mod auth;
mod health;
mod permission;
mod role;
mod user_role;

use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{require_auth, require_permission, require_superuser};
use crate::state::AppState;

/// Every guarded route the server serves, `(method, path template)`.
///
/// Feeds the [`StaticRouteCatalog`](crate::rbac::StaticRouteCatalog), so an
/// api binding can only target a row of this table.
pub const ROUTES: &[(&str, &str)] = &[
    // Permission tree
    ("GET", "/adminapi/system/permissions"),
    ("POST", "/adminapi/system/permission"),
    ("GET", "/adminapi/system/permission/{id}"),
    ("PUT", "/adminapi/system/permission/{id}"),
    ("DELETE", "/adminapi/system/permission/{id}"),
    ("GET", "/adminapi/system/permission/{id}/children"),
    ("PUT", "/adminapi/system/permission/{id}/sort"),
    // Api registry
    ("GET", "/adminapi/system/apis"),
    ("POST", "/adminapi/system/api"),
    ("PUT", "/adminapi/system/api/{id}"),
    ("DELETE", "/adminapi/system/api/{id}"),
    ("GET", "/adminapi/system/routes"),
    // Roles
    ("GET", "/adminapi/roles"),
    ("POST", "/adminapi/role"),
    ("GET", "/adminapi/role/{id}"),
    ("PUT", "/adminapi/role/{id}"),
    // User roles
    ("GET", "/adminapi/user/{id}/roles"),
    ("PUT", "/adminapi/user/{id}/roles"),
    // Self
    ("GET", "/adminapi/auth/permissions"),
    ("GET", "/adminapi/auth/me"),
];

/// Routes with their guards, without the outer tower middleware
pub fn build_router(state: &AppState) -> Router<AppState> {
    let system = Router::new()
        .merge(permission::router())
        .merge(apis::router())
        .route_layer(middleware::from_fn(require_superuser))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .merge(role::router())
        .merge(user_role::router())
        .merge(auth::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_permission,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(health::router())
        .merge(system)
        .merge(admin)
}

/// Fully configured application, used by the server and by oneshot tests
pub fn router(state: AppState) -> Router {
    build_router(&state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
