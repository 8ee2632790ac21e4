//! Engine behaviour against the in-memory store

use std::collections::BTreeSet;
use std::sync::Arc;

use shared::rbac::{
    ApiCreate, ApiUpdate, PageQuery, Permission, PermissionCreate, PermissionUpdate, Principal,
    RoleCreate, RoleUpdate, TreeNode,
};
use warden_server::rbac::sort::is_dense;
use warden_server::rbac::{ApiRegistry, Authorizer, StaticRouteCatalog};
use warden_server::{MemoryStore, RbacStore, RepoError};

async fn node(store: &MemoryStore, code: &str, parent_id: i64) -> Permission {
    store
        .create_permission(
            PermissionCreate {
                name: code.to_uppercase(),
                code: code.to_string(),
                remark: String::new(),
                parent_id,
            },
            1,
        )
        .await
        .unwrap()
}

async fn role_with(store: &MemoryStore, permission_ids: Vec<i64>) -> i64 {
    store
        .create_role(
            RoleCreate {
                name: "operator".into(),
                remark: String::new(),
                permission_ids,
            },
            1,
        )
        .await
        .unwrap()
        .id
}

async fn reparent(store: &MemoryStore, p: &Permission, parent_id: i64) -> Result<Permission, RepoError> {
    store
        .update_permission(
            p.id,
            PermissionUpdate {
                name: p.name.clone(),
                code: p.code.clone(),
                remark: p.remark.clone(),
                parent_id,
            },
        )
        .await
}

async fn group_is_dense(store: &MemoryStore, parent_id: i64) -> bool {
    let children = store.list_children(parent_id).await.unwrap();
    is_dense(children.iter().map(|c| c.sort))
}

fn ids(nodes: &[TreeNode]) -> BTreeSet<i64> {
    let mut out = BTreeSet::new();
    let mut stack: Vec<&TreeNode> = nodes.iter().collect();
    while let Some(n) = stack.pop() {
        out.insert(n.permission.id);
        stack.extend(n.children.iter());
    }
    out
}

#[tokio::test]
async fn test_sibling_sorts_stay_dense_through_mixed_operations() {
    let store = MemoryStore::new();
    let root = node(&store, "admin", 0).await;
    let mut kids = Vec::new();
    for code in ["a", "b", "c", "d", "e", "f"] {
        kids.push(node(&store, code, root.id).await);
    }
    assert!(group_is_dense(&store, root.id).await);

    store.reorder_permission(kids[0].id, 4).await.unwrap();
    assert!(group_is_dense(&store, root.id).await);
    store.reorder_permission(kids[5].id, 0).await.unwrap();
    assert!(group_is_dense(&store, root.id).await);

    node(&store, "nested", kids[2].id).await;
    store.delete_permission(kids[2].id).await.unwrap();
    assert!(group_is_dense(&store, root.id).await);
    store.delete_permission(kids[3].id).await.unwrap();
    assert!(group_is_dense(&store, root.id).await);

    let g = node(&store, "g", root.id).await;
    assert_eq!(g.sort, 4);
    store.reorder_permission(g.id, 100).await.unwrap();
    assert!(group_is_dense(&store, root.id).await);
    assert_eq!(store.list_children(root.id).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_reorder_moves_up_into_place() {
    let store = MemoryStore::new();
    let admin = node(&store, "admin", 0).await;
    let billing = node(&store, "billing", 0).await;
    assert_eq!((admin.sort, billing.sort), (0, 1));

    let moved = store.reorder_permission(billing.id, 0).await.unwrap();
    assert_eq!(moved.sort, 0);
    let admin = store.get_permission(admin.id).await.unwrap().unwrap();
    assert_eq!(admin.sort, 1);

    let roots: Vec<i64> = store.list_children(0).await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(roots, vec![billing.id, admin.id]);
}

#[tokio::test]
async fn test_reorder_missing_node() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.reorder_permission(42, 0).await,
        Err(RepoError::PermissionNotFound(42))
    ));
}

#[tokio::test]
async fn test_reparent_under_self_or_descendant_is_cyclic() {
    let store = MemoryStore::new();
    let a = node(&store, "a", 0).await;
    let b = node(&store, "b", a.id).await;
    let c = node(&store, "c", b.id).await;
    let other = node(&store, "other", 0).await;

    for target in [a.id, b.id, c.id] {
        assert!(matches!(
            reparent(&store, &a, target).await,
            Err(RepoError::CyclicParent { .. })
        ));
    }
    assert!(matches!(
        reparent(&store, &b, c.id).await,
        Err(RepoError::CyclicParent { .. })
    ));

    let moved = reparent(&store, &a, other.id).await.unwrap();
    assert_eq!(moved.parent_id, other.id);
    assert_eq!(moved.sort, a.sort);
}

#[tokio::test]
async fn test_update_check_order() {
    let store = MemoryStore::new();
    let a = node(&store, "a", 0).await;
    let b = node(&store, "b", 0).await;

    let ghost = Permission { id: 999, ..a.clone() };
    assert!(matches!(
        reparent(&store, &ghost, 0).await,
        Err(RepoError::PermissionNotFound(999))
    ));
    assert!(matches!(
        reparent(&store, &a, 777).await,
        Err(RepoError::ParentNotFound(777))
    ));

    let clash = PermissionUpdate {
        name: "B".into(),
        code: "a".into(),
        remark: String::new(),
        parent_id: 0,
    };
    assert!(matches!(
        store.update_permission(b.id, clash).await,
        Err(RepoError::CodeDuplicated { .. })
    ));
    // keeping its own code is not a collision
    assert!(reparent(&store, &a, 0).await.is_ok());
}

#[tokio::test]
async fn test_delete_cascades_and_prunes_apis() {
    let store = MemoryStore::new();
    let admin = node(&store, "admin", 0).await;
    let user = node(&store, "user", admin.id).await;
    let create = node(&store, "create", user.id).await;
    let keep = node(&store, "keep", admin.id).await;

    let api = store
        .create_api(
            ApiCreate {
                method: "post".into(),
                path: "/adminapi/user".into(),
                permission_ids: vec![create.id, keep.id, user.id],
            },
            1,
        )
        .await
        .unwrap();
    assert_eq!(api.method, "POST");

    let removed = store.delete_permission(user.id).await.unwrap();
    assert_eq!(removed.last(), Some(&user.id));
    assert_eq!(removed.iter().copied().collect::<BTreeSet<_>>(), BTreeSet::from([user.id, create.id]));

    assert!(store.get_permission(user.id).await.unwrap().is_none());
    assert!(store.get_permission(create.id).await.unwrap().is_none());
    let api = store.get_api(api.id).await.unwrap().unwrap();
    assert_eq!(api.permission_ids, vec![keep.id]);

    let keep = store.get_permission(keep.id).await.unwrap().unwrap();
    assert_eq!(keep.sort, 0);

    // second delete is a no-op
    assert!(store.delete_permission(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_subtree_nests_children_in_sort_order() {
    let store = MemoryStore::new();
    let admin = node(&store, "admin", 0).await;
    let user = node(&store, "user", admin.id).await;
    let role = node(&store, "role", admin.id).await;
    let menu = node(&store, "menu", user.id).await;
    store.reorder_permission(role.id, 0).await.unwrap();

    let forest = store.list_subtree(0).await.unwrap();
    assert_eq!(forest.len(), 1);
    let top = &forest[0];
    assert_eq!(top.permission.id, admin.id);
    let order: Vec<i64> = top.children.iter().map(|c| c.permission.id).collect();
    assert_eq!(order, vec![role.id, user.id]);
    assert_eq!(top.children[1].children[0].permission.id, menu.id);

    let below_admin = store.list_subtree(admin.id).await.unwrap();
    assert_eq!(ids(&below_admin), BTreeSet::from([user.id, role.id, menu.id]));
}

#[tokio::test]
async fn test_full_code_resolution() {
    let store = MemoryStore::new();
    let admin = node(&store, "admin", 0).await;
    let user = node(&store, "user", admin.id).await;
    node(&store, "user", 0).await;

    let found = store.get_permission_by_full_code("admin.user").await.unwrap();
    assert_eq!(found.id, user.id);

    for missing in ["admin.role", "user.admin", "", "admin..user", "admin.user.create"] {
        assert!(matches!(
            store.get_permission_by_full_code(missing).await,
            Err(RepoError::FullCodeNotFound(_))
        ));
    }
}

#[tokio::test]
async fn test_check_permission_policy() {
    let store = Arc::new(MemoryStore::new());
    let p: Vec<Permission> = futures::future::join_all(
        ["p1", "p2", "p3", "p4", "p5"].map(|code| node(&store, code, 0)),
    )
    .await;
    let [p1, p2, p3, p4, p5] = [p[0].id, p[1].id, p[2].id, p[3].id, p[4].id];

    let role = role_with(&store, vec![p1, p2]).await;
    store.replace_roles_for_user(7, &[role]).await.unwrap();

    let authz = Authorizer::new(store.clone());
    let user = Principal::user(7);
    let nobody = Principal::user(8);
    let root = Principal::superuser(1);

    assert!(!authz.check_permission(&user, &BTreeSet::from([p3, p4])).await.unwrap());
    assert!(authz.check_permission(&user, &BTreeSet::from([p2, p5])).await.unwrap());
    assert!(authz.check_permission(&user, &BTreeSet::new()).await.unwrap());
    assert!(authz.check_permission(&nobody, &BTreeSet::new()).await.unwrap());
    assert!(!authz.check_permission(&nobody, &BTreeSet::from([p1])).await.unwrap());
    assert!(authz.check_permission(&root, &BTreeSet::from([p3, p4, p5])).await.unwrap());
}

#[tokio::test]
async fn test_unregistered_route_is_open() {
    let store = Arc::new(MemoryStore::new());
    let authz = Authorizer::new(store.clone());
    let required = authz
        .resolve_required_permissions("GET", "/adminapi/roles")
        .await
        .unwrap();
    assert!(required.is_empty());
    assert!(authz.authorize_route(&Principal::user(3), "GET", "/adminapi/roles").await.is_ok());
}

#[tokio::test]
async fn test_authorize_route_denies_without_overlap() {
    let store = Arc::new(MemoryStore::new());
    let menu = node(&store, "menu", 0).await;
    store
        .create_api(
            ApiCreate {
                method: "GET".into(),
                path: "/adminapi/roles".into(),
                permission_ids: vec![menu.id],
            },
            1,
        )
        .await
        .unwrap();

    let authz = Authorizer::new(store.clone());
    let err = authz
        .authorize_route(&Principal::user(3), "get", "/adminapi/roles")
        .await
        .unwrap_err();
    assert_eq!(err.code, shared::ErrorCode::PermissionDenied);
    assert!(err.details.is_none());

    let role = role_with(&store, vec![menu.id]).await;
    store.replace_roles_for_user(3, &[role]).await.unwrap();
    assert!(authz.authorize_route(&Principal::user(3), "GET", "/adminapi/roles").await.is_ok());
}

#[tokio::test]
async fn test_check_permissions_by_full_code() {
    let store = Arc::new(MemoryStore::new());
    let admin = node(&store, "admin", 0).await;
    let create = node(&store, "create", admin.id).await;
    node(&store, "update", admin.id).await;
    let role = role_with(&store, vec![create.id]).await;
    store.replace_roles_for_user(5, &[role]).await.unwrap();

    let authz = Authorizer::new(store.clone());
    let codes: Vec<String> = ["admin.create", "admin.update", "admin.delete"]
        .map(String::from)
        .to_vec();

    let user = authz
        .check_permissions_by_full_code(&Principal::user(5), &codes)
        .await
        .unwrap();
    assert_eq!(user["admin.create"], true);
    assert_eq!(user["admin.update"], false);
    assert_eq!(user["admin.delete"], false);

    let root = authz
        .check_permissions_by_full_code(&Principal::superuser(1), &codes)
        .await
        .unwrap();
    assert!(root.values().all(|granted| *granted));
}

#[tokio::test]
async fn test_replace_roles_is_idempotent() {
    let store = MemoryStore::new();
    let r1 = role_with(&store, vec![]).await;
    let r2 = role_with(&store, vec![]).await;

    store.replace_roles_for_user(9, &[r2, r1]).await.unwrap();
    store.replace_roles_for_user(9, &[r2, r1]).await.unwrap();

    let edges = store.user_role_edges(9);
    assert_eq!(edges.len(), 2);
    let roles: Vec<i64> = store
        .list_roles_for_user(9)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(roles, vec![r2, r1]);

    assert!(matches!(
        store.replace_roles_for_user(9, &[r1, 404]).await,
        Err(RepoError::RoleNotFound(404))
    ));
    assert_eq!(store.user_role_edges(9).len(), 2);

    store.replace_roles_for_user(9, &[]).await.unwrap();
    assert!(store.list_roles_for_user(9).await.unwrap().is_empty());
}

fn registry(store: Arc<MemoryStore>) -> ApiRegistry {
    let routes = StaticRouteCatalog::from_table(&[
        ("POST", "/user"),
        ("PUT", "/user/{id}"),
        ("GET", "/users"),
    ]);
    ApiRegistry::new(store, Arc::new(routes))
}

#[tokio::test]
async fn test_registry_rejects_duplicate_routes() {
    let store = Arc::new(MemoryStore::new());
    let p1 = node(&store, "p1", 0).await;
    let p2 = node(&store, "p2", 0).await;
    let registry = registry(store.clone());

    let create = |id: i64| ApiCreate {
        method: "POST".into(),
        path: "/user".into(),
        permission_ids: vec![id],
    };
    registry.create(create(p1.id), 1).await.unwrap();
    assert!(matches!(
        registry.create(create(p2.id), 1).await,
        Err(RepoError::ApiExists { .. })
    ));
}

#[tokio::test]
async fn test_registry_validates_routes_and_permissions() {
    let store = Arc::new(MemoryStore::new());
    let p1 = node(&store, "p1", 0).await;
    let registry = registry(store.clone());

    assert!(matches!(
        registry
            .create(
                ApiCreate {
                    method: "DELETE".into(),
                    path: "/user/{id}".into(),
                    permission_ids: vec![p1.id],
                },
                1,
            )
            .await,
        Err(RepoError::RouteNotFound { .. })
    ));
    assert!(matches!(
        registry
            .create(
                ApiCreate {
                    method: "GET".into(),
                    path: "/users".into(),
                    permission_ids: vec![p1.id, 999],
                },
                1,
            )
            .await,
        Err(RepoError::PermissionsMissing(missing)) if missing == vec![999]
    ));

    let api = registry
        .create(
            ApiCreate {
                method: "get".into(),
                path: "/users".into(),
                permission_ids: vec![p1.id],
            },
            1,
        )
        .await
        .unwrap();
    assert!(matches!(
        registry
            .update(
                api.id,
                ApiUpdate {
                    method: "GET".into(),
                    path: "/nope".into(),
                    permission_ids: vec![],
                },
            )
            .await,
        Err(RepoError::RouteNotFound { .. })
    ));
    assert!(matches!(
        registry
            .update(
                9999,
                ApiUpdate {
                    method: "PUT".into(),
                    path: "/user/{id}".into(),
                    permission_ids: vec![],
                },
            )
            .await,
        Err(RepoError::ApiNotFound(9999))
    ));

    registry.delete(api.id).await.unwrap();
    registry.delete(api.id).await.unwrap();
    let (page, total) = registry.find(&Default::default(), PageQuery::default()).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_update_api_reports_taken_route_before_missing_id() {
    let store = Arc::new(MemoryStore::new());
    let registry = registry(store.clone());
    registry
        .create(
            ApiCreate {
                method: "GET".into(),
                path: "/users".into(),
                permission_ids: vec![],
            },
            1,
        )
        .await
        .unwrap();

    assert!(matches!(
        registry
            .update(
                9999,
                ApiUpdate {
                    method: "GET".into(),
                    path: "/users".into(),
                    permission_ids: vec![],
                },
            )
            .await,
        Err(RepoError::ApiExists { .. })
    ));
}

fn role_update(name: &str, permission_ids: Vec<i64>) -> RoleUpdate {
    RoleUpdate {
        name: name.to_string(),
        remark: String::new(),
        permission_ids,
    }
}

#[tokio::test]
async fn test_role_store_update_replaces_permission_set() {
    let store = MemoryStore::new();
    let a = node(&store, "a", 0).await;
    let b = node(&store, "b", 0).await;
    let c = node(&store, "c", 0).await;

    let role = role_with(&store, vec![a.id, b.id, a.id]).await;
    assert_eq!(
        store.get_role(role).await.unwrap().unwrap().permission_ids,
        vec![a.id, b.id]
    );

    let updated = store
        .update_role(role, role_update("auditor", vec![c.id]))
        .await
        .unwrap();
    assert_eq!(updated.name, "auditor");
    assert_eq!(updated.permission_ids, vec![c.id]);
    assert_eq!(
        store.get_role(role).await.unwrap().unwrap().permission_ids,
        vec![c.id]
    );
}

#[tokio::test]
async fn test_role_store_update_missing_role() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.update_role(404, role_update("ghost", vec![])).await,
        Err(RepoError::RoleNotFound(404))
    ));
}

#[tokio::test]
async fn test_role_store_rejects_unknown_permissions() {
    let store = MemoryStore::new();
    let a = node(&store, "a", 0).await;

    let err = store
        .create_role(
            RoleCreate {
                name: "broken".into(),
                remark: String::new(),
                permission_ids: vec![a.id, 777],
            },
            1,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PermissionsMissing(missing) if missing == vec![777]));
    let (_, total) = store.find_roles(None, PageQuery::default()).await.unwrap();
    assert_eq!(total, 0);

    let role = role_with(&store, vec![a.id]).await;
    let err = store
        .update_role(role, role_update("operator", vec![888]))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::PermissionsMissing(missing) if missing == vec![888]));
    // Rejected update leaves the role untouched.
    assert_eq!(
        store.get_role(role).await.unwrap().unwrap().permission_ids,
        vec![a.id]
    );
}

#[tokio::test]
async fn test_role_store_find_matches_name_newest_first() {
    let store = MemoryStore::new();
    for name in ["Ops Admin", "auditor", "SysOps"] {
        store
            .create_role(
                RoleCreate {
                    name: name.into(),
                    remark: String::new(),
                    permission_ids: vec![],
                },
                1,
            )
            .await
            .unwrap();
    }

    let (roles, total) = store.find_roles(Some("OPS"), PageQuery::default()).await.unwrap();
    assert_eq!(total, 2);
    let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["SysOps", "Ops Admin"]);

    let (page, total) = store.find_roles(None, PageQuery::new(2, 2)).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "Ops Admin");
}

#[tokio::test]
async fn test_seeded_store_holds_default_tree() {
    let store = MemoryStore::seeded();

    let api = store.get_permission_by_full_code("admin.system.api").await.unwrap();
    assert_eq!(api.id, 13);
    let codes: Vec<String> = store
        .list_children(1)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.code)
        .collect();
    assert_eq!(codes, vec!["user", "role", "system"]);
    for parent_id in [0, 1, 2, 6, 10] {
        assert!(group_is_dense(&store, parent_id).await);
    }

    let binding = store
        .find_api_by_method_and_path("PUT", "/adminapi/role/{id}")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(binding.permission_ids, vec![9]);

    // New rows never reuse a seeded id.
    let extra = node(&store, "extra", 0).await;
    assert!(extra.id > 13);
    assert_eq!(extra.sort, 1);
}
