//! Persistent store seam
//!
//! [`RbacStore`] is everything the engine needs from the relational store.
//! Every mutating method is one atomic unit: it either applies completely
//! or returns an error with nothing written.
//!
//! - [`MemoryStore`]: single-lock in-process tables, used by tests and demos
//! - [`PgStore`]: PostgreSQL via sqlx, one transaction per call

mod memory;
mod postgres;
pub mod seed;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::collections::BTreeSet;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::rbac::{
    Api, ApiCreate, ApiUpdate, PageQuery, Permission, PermissionCreate, PermissionUpdate, Role,
    RoleCreate, RoleUpdate, TreeNode,
};
use thiserror::Error;

use crate::rbac::tree::split_full_code;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("permission {0} not found")]
    PermissionNotFound(i64),

    #[error("permissions not found: {0:?}")]
    PermissionsMissing(Vec<i64>),

    #[error("parent permission {0} not found")]
    ParentNotFound(i64),

    #[error("permission code '{code}' already exists under parent {parent_id}")]
    CodeDuplicated { parent_id: i64, code: String },

    #[error("permission {parent_id} is {id} itself or one of its descendants")]
    CyclicParent { id: i64, parent_id: i64 },

    #[error("full code '{0}' does not resolve")]
    FullCodeNotFound(String),

    #[error("api {0} not found")]
    ApiNotFound(i64),

    #[error("api {method} {path} already exists")]
    ApiExists { method: String, path: String },

    #[error("route {method} {path} is not served")]
    RouteNotFound { method: String, path: String },

    #[error("role {0} not found")]
    RoleNotFound(i64),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::PermissionNotFound(id) => {
                AppError::new(ErrorCode::PermissionNotFound).with_detail("id", id)
            }
            RepoError::PermissionsMissing(ids) => {
                AppError::new(ErrorCode::PermissionNotFound).with_detail("ids", ids)
            }
            RepoError::ParentNotFound(id) => {
                AppError::new(ErrorCode::ParentPermissionNotFound).with_detail("parent_id", id)
            }
            RepoError::CodeDuplicated { parent_id, code } => {
                AppError::new(ErrorCode::PermissionCodeDuplicated)
                    .with_detail("parent_id", parent_id)
                    .with_detail("code", code)
            }
            RepoError::CyclicParent { id, parent_id } => {
                AppError::new(ErrorCode::PermissionParentInvalid)
                    .with_detail("id", id)
                    .with_detail("parent_id", parent_id)
            }
            RepoError::FullCodeNotFound(code) => {
                AppError::new(ErrorCode::PermissionNotFound).with_detail("code", code)
            }
            RepoError::ApiNotFound(id) => AppError::new(ErrorCode::ApiNotFound).with_detail("id", id),
            RepoError::ApiExists { method, path } => AppError::new(ErrorCode::ApiExists)
                .with_detail("method", method)
                .with_detail("path", path),
            RepoError::RouteNotFound { method, path } => AppError::new(ErrorCode::RouteNotFound)
                .with_detail("method", method)
                .with_detail("path", path),
            RepoError::RoleNotFound(id) => {
                AppError::new(ErrorCode::RoleNotFound).with_detail("id", id)
            }
            RepoError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Filter for [`RbacStore::find_apis`]
#[derive(Debug, Clone, Default)]
pub struct ApiFilter {
    /// Exact method match
    pub method: Option<String>,
    /// Path prefix match
    pub path_prefix: Option<String>,
}

#[async_trait]
pub trait RbacStore: Send + Sync {
    // ========== Permission tree ==========

    /// Append a node at the end of its sibling group.
    async fn create_permission(
        &self,
        input: PermissionCreate,
        created_by: i64,
    ) -> RepoResult<Permission>;

    async fn get_permission(&self, id: i64) -> RepoResult<Option<Permission>>;

    async fn get_permission_by_code(
        &self,
        code: &str,
        parent_id: i64,
    ) -> RepoResult<Option<Permission>>;

    /// Resolve `admin.user.create` one segment per level, starting at the roots.
    async fn get_permission_by_full_code(&self, full_code: &str) -> RepoResult<Permission> {
        let not_found = || RepoError::FullCodeNotFound(full_code.to_string());
        let segments = split_full_code(full_code).ok_or_else(not_found)?;

        let mut parent_id = shared::rbac::ROOT_PARENT_ID;
        let mut found = None;
        for segment in segments {
            let node = self
                .get_permission_by_code(segment, parent_id)
                .await?
                .ok_or_else(not_found)?;
            parent_id = node.id;
            found = Some(node);
        }
        found.ok_or_else(not_found)
    }

    /// Direct children ordered by ascending `sort`
    async fn list_children(&self, parent_id: i64) -> RepoResult<Vec<Permission>>;

    /// Every node below `parent_id` with its nested children
    async fn list_subtree(&self, parent_id: i64) -> RepoResult<Vec<TreeNode>>;

    /// Chain from the root down to `id`, `id` included
    async fn list_ancestors(&self, id: i64) -> RepoResult<Vec<Permission>>;

    /// Rename, recode or re-parent. `sort` is left untouched.
    async fn update_permission(&self, id: i64, input: PermissionUpdate) -> RepoResult<Permission>;

    /// Move a node inside its sibling group, shifting the siblings in between.
    async fn reorder_permission(&self, id: i64, new_sort: i32) -> RepoResult<Permission>;

    /// Remove a node with its whole subtree and prune the removed ids from every api.
    /// Absent ids are a no-op; returns the removed ids.
    async fn delete_permission(&self, id: i64) -> RepoResult<Vec<i64>>;

    // ========== API registry ==========

    async fn create_api(&self, input: ApiCreate, created_by: i64) -> RepoResult<Api>;

    async fn update_api(&self, id: i64, input: ApiUpdate) -> RepoResult<Api>;

    /// Absent ids are a no-op
    async fn delete_api(&self, id: i64) -> RepoResult<()>;

    async fn get_api(&self, id: i64) -> RepoResult<Option<Api>>;

    async fn find_api_by_method_and_path(&self, method: &str, path: &str)
    -> RepoResult<Option<Api>>;

    /// Newest first, with the unpaginated total
    async fn find_apis(&self, filter: &ApiFilter, page: PageQuery) -> RepoResult<(Vec<Api>, u64)>;

    // ========== Roles ==========

    async fn create_role(&self, input: RoleCreate, created_by: i64) -> RepoResult<Role>;

    async fn update_role(&self, id: i64, input: RoleUpdate) -> RepoResult<Role>;

    async fn get_role(&self, id: i64) -> RepoResult<Option<Role>>;

    /// Case-insensitive substring match on name, newest first
    async fn find_roles(&self, name: Option<&str>, page: PageQuery)
    -> RepoResult<(Vec<Role>, u64)>;

    // ========== User roles ==========

    /// Swap every edge of `user_id` for one edge per role in `role_ids`.
    async fn replace_roles_for_user(&self, user_id: i64, role_ids: &[i64]) -> RepoResult<()>;

    /// Roles in the order they were assigned
    async fn list_roles_for_user(&self, user_id: i64) -> RepoResult<Vec<Role>>;

    /// Union of the permission ids of every role the user holds
    async fn permission_ids_for_user(&self, user_id: i64) -> RepoResult<BTreeSet<i64>> {
        Ok(self
            .list_roles_for_user(user_id)
            .await?
            .into_iter()
            .flat_map(|role| role.permission_ids)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_error_codes() {
        let cases = [
            (RepoError::PermissionNotFound(1), ErrorCode::PermissionNotFound),
            (RepoError::PermissionsMissing(vec![1, 2]), ErrorCode::PermissionNotFound),
            (RepoError::ParentNotFound(1), ErrorCode::ParentPermissionNotFound),
            (
                RepoError::CodeDuplicated {
                    parent_id: 0,
                    code: "admin".into(),
                },
                ErrorCode::PermissionCodeDuplicated,
            ),
            (
                RepoError::CyclicParent { id: 1, parent_id: 2 },
                ErrorCode::PermissionParentInvalid,
            ),
            (RepoError::FullCodeNotFound("a.b".into()), ErrorCode::PermissionNotFound),
            (RepoError::ApiNotFound(1), ErrorCode::ApiNotFound),
            (
                RepoError::ApiExists {
                    method: "POST".into(),
                    path: "/user".into(),
                },
                ErrorCode::ApiExists,
            ),
            (
                RepoError::RouteNotFound {
                    method: "POST".into(),
                    path: "/nope".into(),
                },
                ErrorCode::RouteNotFound,
            ),
            (RepoError::RoleNotFound(1), ErrorCode::RoleNotFound),
            (RepoError::Database("boom".into()), ErrorCode::DatabaseError),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).code, code);
        }
    }

    #[test]
    fn test_database_error_hides_details() {
        let err = AppError::from(RepoError::Database("password=secret".into()));
        assert!(err.details.is_none());
        assert!(!err.message.contains("secret"));
    }
}
