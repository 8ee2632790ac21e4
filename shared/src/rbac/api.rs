//! Api Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Access controlled route descriptor (接口权限绑定)
///
/// `path` is the route template exactly as the router declares it,
/// e.g. `/adminapi/role/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Api {
    pub id: i64,
    pub method: String,
    pub path: String,
    pub permission_ids: Vec<i64>,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create api payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiCreate {
    #[validate(length(min = 1, max = 32))]
    pub method: String,
    #[validate(length(min = 1, max = 256))]
    pub path: String,
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// Update api payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiUpdate {
    #[validate(length(min = 1, max = 32))]
    pub method: String,
    #[validate(length(min = 1, max = 256))]
    pub path: String,
    #[serde(default)]
    pub permission_ids: Vec<i64>,
}

/// Route exposed by the running server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
}

impl RouteInfo {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

/// Normalize an HTTP verb for storage and comparison
pub fn normalize_method(method: &str) -> String {
    method.trim().to_ascii_uppercase()
}

/// Deduplicate ids while keeping first-seen order
pub fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_method() {
        assert_eq!(normalize_method("post"), "POST");
        assert_eq!(normalize_method(" Get "), "GET");
    }

    #[test]
    fn test_dedup_ids() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(dedup_ids(&[]).is_empty());
    }

    #[test]
    fn test_api_create_validation() {
        let payload = ApiCreate {
            method: "POST".into(),
            path: String::new(),
            permission_ids: vec![1],
        };
        assert!(payload.validate().is_err());
    }
}
