//! Default administration tree
//!
//! The same rows `migrations/0002_seed.sql` writes, for stores that do not run migrations.
//!
//! ```text
//! admin
//! ├── user    { menu, create, update }
//! ├── role    { menu, create, update }
//! └── system  { menu, permission, api }
//! ```

/// The bootstrap superuser
pub const DEFAULT_ADMIN_ID: i64 = 1;
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// `(id, name, code, parent_id, sort)`
pub const DEFAULT_PERMISSIONS: &[(i64, &str, &str, i64, i32)] = &[
    (1, "Administration", "admin", 0, 0),
    (2, "User management", "user", 1, 0),
    (3, "User menu", "menu", 2, 0),
    (4, "Create user", "create", 2, 1),
    (5, "Update user", "update", 2, 2),
    (6, "Role management", "role", 1, 1),
    (7, "Role menu", "menu", 6, 0),
    (8, "Create role", "create", 6, 1),
    (9, "Update role", "update", 6, 2),
    (10, "System", "system", 1, 2),
    (11, "System menu", "menu", 10, 0),
    (12, "Permission settings", "permission", 10, 1),
    (13, "Api settings", "api", 10, 2),
];

/// `(method, path, permission_ids)`
pub const DEFAULT_API_BINDINGS: &[(&str, &str, &[i64])] = &[
    ("GET", "/adminapi/roles", &[7]),
    ("GET", "/adminapi/role/{id}", &[7]),
    ("POST", "/adminapi/role", &[8]),
    ("PUT", "/adminapi/role/{id}", &[9]),
    ("GET", "/adminapi/user/{id}/roles", &[3]),
    ("PUT", "/adminapi/user/{id}/roles", &[5]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ROUTES;

    #[test]
    fn test_parents_precede_children() {
        for (i, &(_, _, _, parent_id, _)) in DEFAULT_PERMISSIONS.iter().enumerate() {
            if parent_id != 0 {
                assert!(DEFAULT_PERMISSIONS[..i].iter().any(|p| p.0 == parent_id));
            }
        }
    }

    #[test]
    fn test_bindings_target_served_routes() {
        for &(method, path, permission_ids) in DEFAULT_API_BINDINGS {
            assert!(ROUTES.contains(&(method, path)), "{method} {path}");
            assert!(
                permission_ids
                    .iter()
                    .all(|id| DEFAULT_PERMISSIONS.iter().any(|p| p.0 == *id))
            );
        }
    }
}
