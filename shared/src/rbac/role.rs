//! Role Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Role entity (RBAC 角色)
///
/// Names are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub remark: String,
    pub permission_ids: Vec<i64>,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create role payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleCreate {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub remark: String,
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// Update role payload, `permission_ids` replaces the existing set
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleUpdate {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub remark: String,
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// User ↔ role edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct UserRole {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub created_at: i64,
}

/// Replace every role held by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRolesReplace {
    #[serde(default)]
    pub role_ids: Vec<i64>,
}
