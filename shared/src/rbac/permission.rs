//! Permission Model

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Parent id used by root permissions
pub const ROOT_PARENT_ID: i64 = 0;

/// Separator between code segments of a full code (`admin.user.create`)
pub const FULL_CODE_SEPARATOR: char = '.';

/// Permission node (权限树节点)
///
/// `sort` is only meaningful inside the sibling group sharing `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub parent_id: i64,
    pub remark: String,
    pub sort: i32,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Transient subtree result, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub permission: Permission,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(permission: Permission) -> Self {
        Self {
            permission,
            children: Vec::new(),
        }
    }

    /// Count this node and every node below it
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Validation error code raised by [`validate_code`]
pub const PERMISSION_CODE_INVALID: &str = "permission_code";

/// A permission code is one tree segment, so it can never contain the separator.
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    let reason = if code.trim().is_empty() {
        "must not be blank"
    } else if code.contains(FULL_CODE_SEPARATOR) {
        "must not contain '.'"
    } else if code.chars().any(char::is_whitespace) {
        "must not contain whitespace"
    } else {
        return Ok(());
    };
    Err(ValidationError::new(PERMISSION_CODE_INVALID).with_message(Cow::Borrowed(reason)))
}

/// Create permission payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PermissionCreate {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 64), custom(function = "validate_code"))]
    pub code: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub remark: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub parent_id: i64,
}

/// Update permission payload (full replace of the editable fields)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PermissionUpdate {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 64), custom(function = "validate_code"))]
    pub code: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub remark: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub parent_id: i64,
}

/// Move a permission to a new position in its sibling group
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct PermissionReorder {
    #[validate(range(min = 0))]
    pub sort: i32,
}
