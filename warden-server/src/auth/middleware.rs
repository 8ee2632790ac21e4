//! 认证中间件
//!
//! Route guards, applied with `route_layer` so unmatched paths still 404.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};
use shared::rbac::Principal;

use crate::security_log;
use crate::state::AppState;

/// 认证中间件 - 要求用户登录
///
/// Reads the user id forwarded by the gateway, loads the account and
/// injects its [`Principal`] into the request extensions.
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | header missing or not an id | 401 NotAuthenticated |
/// | unknown user | 401 NotAuthenticated |
/// | disabled user | 401 AccountDisabled |
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = req
        .headers()
        .get(&state.user_header)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());

    let Some(user_id) = user_id else {
        security_log!(WARN, "auth_missing", uri = ?req.uri());
        return Err(AppError::not_authenticated());
    };

    let Some(user) = state.identity.find_user(user_id).await? else {
        security_log!(WARN, "auth_unknown_user", user_id);
        return Err(AppError::not_authenticated());
    };
    if !user.is_active {
        security_log!(WARN, "auth_disabled_user", user_id);
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    req.extensions_mut().insert(user.principal());
    Ok(next.run(req).await)
}

/// 权限检查中间件
///
/// Looks up the permissions bound to the matched route template and
/// method. Routes with no binding are open to any authenticated caller.
/// Denial is a bare 403 that does not name the missing permission.
pub async fn require_permission(
    State(state): State<AppState>,
    matched: Option<MatchedPath>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .copied()
        .ok_or_else(AppError::not_authenticated)?;

    let path = matched
        .as_ref()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    state
        .authorizer
        .authorize_route(&principal, req.method().as_str(), &path)
        .await?;
    Ok(next.run(req).await)
}

/// 超级管理员中间件
pub async fn require_superuser(req: Request, next: Next) -> Result<Response, AppError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .copied()
        .ok_or_else(AppError::not_authenticated)?;

    if !principal.is_superuser {
        security_log!(
            WARN,
            "superuser_required",
            user_id = principal.user_id,
            uri = ?req.uri()
        );
        return Err(AppError::superuser_required());
    }
    Ok(next.run(req).await)
}
