//! Route introspection
//!
//! The API registry only binds permissions to routes the server actually
//! serves. The engine learns about them through [`RouteCatalog`] and never
//! looks inside the router.

use std::collections::BTreeSet;

use shared::rbac::{RouteInfo, normalize_method};

pub trait RouteCatalog: Send + Sync {
    /// Whether `(method, path)` is served. Methods compare case-insensitively.
    fn exists(&self, method: &str, path: &str) -> bool;

    /// Routes whose path starts with `path_prefix` and whose method matches, sorted by path.
    fn list(&self, path_prefix: Option<&str>, method: Option<&str>) -> Vec<RouteInfo>;
}

/// Catalog over a fixed route table
#[derive(Debug, Clone, Default)]
pub struct StaticRouteCatalog {
    // (path, method) so iteration is grouped by path
    routes: BTreeSet<(String, String)>,
}

impl StaticRouteCatalog {
    pub fn new(routes: impl IntoIterator<Item = RouteInfo>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|r| (r.path, normalize_method(&r.method)))
                .collect(),
        }
    }

    pub fn from_table(table: &[(&str, &str)]) -> Self {
        Self::new(table.iter().map(|(m, p)| RouteInfo::new(*m, *p)))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteCatalog for StaticRouteCatalog {
    fn exists(&self, method: &str, path: &str) -> bool {
        self.routes
            .contains(&(path.to_string(), normalize_method(method)))
    }

    fn list(&self, path_prefix: Option<&str>, method: Option<&str>) -> Vec<RouteInfo> {
        let method = method.map(normalize_method).filter(|m| !m.is_empty());
        let prefix = path_prefix.unwrap_or_default();
        self.routes
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .filter(|(_, m)| method.as_ref().is_none_or(|want| want == m))
            .map(|(path, m)| RouteInfo::new(m.clone(), path.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticRouteCatalog {
        StaticRouteCatalog::from_table(&[
            ("GET", "/adminapi/roles"),
            ("POST", "/adminapi/role"),
            ("PUT", "/adminapi/role/{id}"),
            ("get", "/adminapi/role/{id}"),
            ("GET", "/health"),
        ])
    }

    #[test]
    fn test_exists_is_case_insensitive_on_method() {
        let c = catalog();
        assert!(c.exists("POST", "/adminapi/role"));
        assert!(c.exists("post", "/adminapi/role"));
        assert!(c.exists("GET", "/adminapi/role/{id}"));
        assert!(!c.exists("DELETE", "/adminapi/role/{id}"));
        assert!(!c.exists("GET", "/adminapi/role/7"));
    }

    #[test]
    fn test_list_filters() {
        let c = catalog();
        assert_eq!(c.list(None, None).len(), 5);

        let admin = c.list(Some("/adminapi"), None);
        assert_eq!(admin.len(), 4);
        assert!(admin.iter().all(|r| r.path.starts_with("/adminapi")));

        let gets = c.list(Some("/adminapi/role"), Some("get"));
        assert_eq!(
            gets,
            vec![
                RouteInfo::new("GET", "/adminapi/role/{id}"),
                RouteInfo::new("GET", "/adminapi/roles"),
            ]
        );
    }

    #[test]
    fn test_blank_method_filter_matches_all() {
        assert_eq!(catalog().list(Some("/adminapi/role/"), Some("")).len(), 2);
    }
}
