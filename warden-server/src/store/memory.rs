//! In-memory implementation of [`RbacStore`].
//!
//! # Purpose
//! Keeps every table in process memory. It exists for:
//! - unit and integration tests (no database required)
//! - local demos with `WARDEN_STORE=memory`
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Serialized mutations**: all tables live behind one `parking_lot::RwLock`.
//!   A mutating call takes the write lock once and holds it for validation and
//!   write alike, so a call either applies completely or not at all, and
//!   concurrent calls never interleave. No lock is ever held across an `.await`.
//! - **No multi-node coordination**: every process has its own state.
//!
//! # Performance characteristics
//! Subtree walks and cascading deletes scan the permission table. That is fine
//! for test fixtures and small trees but not meant for large deployments.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::rbac::{
    Api, ApiCreate, ApiUpdate, PageQuery, Permission, PermissionCreate, PermissionUpdate,
    ROOT_PARENT_ID, Role, RoleCreate, RoleUpdate, TreeNode, UserRole, dedup_ids, normalize_method,
};
use shared::util::now_millis;

use super::seed::{DEFAULT_API_BINDINGS, DEFAULT_PERMISSIONS};
use super::{ApiFilter, RbacStore, RepoError, RepoResult};
use crate::rbac::sort::{SortShift, clamp_target, next_sort};
use crate::rbac::tree::{assemble_subtree, descendants_in};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    permissions: BTreeMap<i64, Permission>,
    apis: BTreeMap<i64, Api>,
    roles: BTreeMap<i64, Role>,
    user_roles: Vec<UserRole>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn permission_by_code(&self, code: &str, parent_id: i64) -> Option<&Permission> {
        self.permissions
            .values()
            .find(|p| p.parent_id == parent_id && p.code == code)
    }

    fn siblings_mut(&mut self, parent_id: i64) -> impl Iterator<Item = &mut Permission> {
        self.permissions
            .values_mut()
            .filter(move |p| p.parent_id == parent_id)
    }

    fn ensure_permissions(&self, ids: &[i64]) -> RepoResult<()> {
        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !self.permissions.contains_key(id))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RepoError::PermissionsMissing(missing))
        }
    }

    fn api_by_route(&self, method: &str, path: &str) -> Option<&Api> {
        self.apis
            .values()
            .find(|a| a.method == method && a.path == path)
    }
}

/// Newest first, ties broken by id
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (i64, i64)) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

fn paginate<T>(items: Vec<T>, page: PageQuery) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let take = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    (items.into_iter().skip(skip).take(take).collect(), total)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the default administration tree and its route bindings
    pub fn seeded() -> Self {
        let now = now_millis();
        let mut t = Tables::default();
        for &(id, name, code, parent_id, sort) in DEFAULT_PERMISSIONS {
            t.permissions.insert(
                id,
                Permission {
                    id,
                    name: name.to_string(),
                    code: code.to_string(),
                    parent_id,
                    remark: String::new(),
                    sort,
                    created_by: 0,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        t.next_id = t.permissions.keys().copied().max().unwrap_or_default();
        for &(method, path, permission_ids) in DEFAULT_API_BINDINGS {
            let api = Api {
                id: t.next_id(),
                method: method.to_string(),
                path: path.to_string(),
                permission_ids: permission_ids.to_vec(),
                created_by: 0,
                created_at: now,
                updated_at: now,
            };
            t.apis.insert(api.id, api);
        }
        Self {
            tables: Arc::new(RwLock::new(t)),
        }
    }

    /// Every edge currently held by `user_id`
    pub fn user_role_edges(&self, user_id: i64) -> Vec<UserRole> {
        self.tables
            .read()
            .user_roles
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RbacStore for MemoryStore {
    async fn create_permission(
        &self,
        input: PermissionCreate,
        created_by: i64,
    ) -> RepoResult<Permission> {
        let mut t = self.tables.write();
        let parent_id = input.parent_id;
        if parent_id != ROOT_PARENT_ID && !t.permissions.contains_key(&parent_id) {
            return Err(RepoError::ParentNotFound(parent_id));
        }
        if t.permission_by_code(&input.code, parent_id).is_some() {
            return Err(RepoError::CodeDuplicated {
                parent_id,
                code: input.code,
            });
        }

        let max = t.siblings_mut(parent_id).map(|p| p.sort).max();
        let now = now_millis();
        let permission = Permission {
            id: t.next_id(),
            name: input.name,
            code: input.code,
            parent_id,
            remark: input.remark,
            sort: next_sort(max),
            created_by,
            created_at: now,
            updated_at: now,
        };
        t.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn get_permission(&self, id: i64) -> RepoResult<Option<Permission>> {
        Ok(self.tables.read().permissions.get(&id).cloned())
    }

    async fn get_permission_by_code(
        &self,
        code: &str,
        parent_id: i64,
    ) -> RepoResult<Option<Permission>> {
        Ok(self
            .tables
            .read()
            .permission_by_code(code, parent_id)
            .cloned())
    }

    async fn list_children(&self, parent_id: i64) -> RepoResult<Vec<Permission>> {
        let t = self.tables.read();
        let mut children: Vec<Permission> = t
            .permissions
            .values()
            .filter(|p| p.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by_key(|p| (p.sort, p.id));
        Ok(children)
    }

    async fn list_subtree(&self, parent_id: i64) -> RepoResult<Vec<TreeNode>> {
        let rows: Vec<Permission> = self.tables.read().permissions.values().cloned().collect();
        Ok(assemble_subtree(parent_id, rows))
    }

    async fn list_ancestors(&self, id: i64) -> RepoResult<Vec<Permission>> {
        let t = self.tables.read();
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = id;
        while cursor != ROOT_PARENT_ID && seen.insert(cursor) {
            let node = t
                .permissions
                .get(&cursor)
                .ok_or(RepoError::PermissionNotFound(cursor))?;
            cursor = node.parent_id;
            chain.push(node.clone());
        }
        chain.reverse();
        Ok(chain)
    }

    async fn update_permission(&self, id: i64, input: PermissionUpdate) -> RepoResult<Permission> {
        let mut t = self.tables.write();
        if !t.permissions.contains_key(&id) {
            return Err(RepoError::PermissionNotFound(id));
        }
        let parent_id = input.parent_id;
        if parent_id != ROOT_PARENT_ID {
            if !t.permissions.contains_key(&parent_id) {
                return Err(RepoError::ParentNotFound(parent_id));
            }
            if parent_id == id || descendants_in(t.permissions.values(), id).contains(parent_id) {
                return Err(RepoError::CyclicParent { id, parent_id });
            }
        }
        if t
            .permission_by_code(&input.code, parent_id)
            .is_some_and(|other| other.id != id)
        {
            return Err(RepoError::CodeDuplicated {
                parent_id,
                code: input.code,
            });
        }

        let node = t
            .permissions
            .get_mut(&id)
            .ok_or(RepoError::PermissionNotFound(id))?;
        node.name = input.name;
        node.code = input.code;
        node.remark = input.remark;
        node.parent_id = parent_id;
        node.updated_at = now_millis();
        Ok(node.clone())
    }

    async fn reorder_permission(&self, id: i64, new_sort: i32) -> RepoResult<Permission> {
        let mut t = self.tables.write();
        let current = t
            .permissions
            .get(&id)
            .cloned()
            .ok_or(RepoError::PermissionNotFound(id))?;

        let count = t.siblings_mut(current.parent_id).count();
        let target = clamp_target(new_sort, count);
        if let Some(shift) = SortShift::for_move(current.sort, target) {
            let now = now_millis();
            for sibling in t.siblings_mut(current.parent_id) {
                if sibling.id == id {
                    sibling.sort = target;
                } else if shift.range.contains(&sibling.sort) {
                    sibling.sort = shift.apply(sibling.sort);
                } else {
                    continue;
                }
                sibling.updated_at = now;
            }
        }

        t.permissions
            .get(&id)
            .cloned()
            .ok_or(RepoError::PermissionNotFound(id))
    }

    async fn delete_permission(&self, id: i64) -> RepoResult<Vec<i64>> {
        let mut t = self.tables.write();
        let Some(node) = t.permissions.get(&id).cloned() else {
            return Ok(Vec::new());
        };

        let mut removed = descendants_in(t.permissions.values(), id).into_post_order();
        removed.push(id);
        for rid in &removed {
            t.permissions.remove(rid);
        }

        let close_gap = SortShift::for_removal(node.sort);
        for sibling in t.siblings_mut(node.parent_id) {
            sibling.sort = close_gap.apply(sibling.sort);
        }

        let gone: HashSet<i64> = removed.iter().copied().collect();
        let now = now_millis();
        for api in t.apis.values_mut() {
            if api.permission_ids.iter().any(|p| gone.contains(p)) {
                api.permission_ids.retain(|p| !gone.contains(p));
                api.updated_at = now;
            }
        }
        Ok(removed)
    }

    async fn create_api(&self, input: ApiCreate, created_by: i64) -> RepoResult<Api> {
        let mut t = self.tables.write();
        let method = normalize_method(&input.method);
        if t.api_by_route(&method, &input.path).is_some() {
            return Err(RepoError::ApiExists {
                method,
                path: input.path,
            });
        }
        let permission_ids = dedup_ids(&input.permission_ids);
        t.ensure_permissions(&permission_ids)?;

        let now = now_millis();
        let api = Api {
            id: t.next_id(),
            method,
            path: input.path,
            permission_ids,
            created_by,
            created_at: now,
            updated_at: now,
        };
        t.apis.insert(api.id, api.clone());
        Ok(api)
    }

    async fn update_api(&self, id: i64, input: ApiUpdate) -> RepoResult<Api> {
        let mut t = self.tables.write();
        let method = normalize_method(&input.method);
        if t
            .api_by_route(&method, &input.path)
            .is_some_and(|other| other.id != id)
        {
            return Err(RepoError::ApiExists {
                method,
                path: input.path,
            });
        }
        if !t.apis.contains_key(&id) {
            return Err(RepoError::ApiNotFound(id));
        }
        let permission_ids = dedup_ids(&input.permission_ids);
        t.ensure_permissions(&permission_ids)?;

        let api = t.apis.get_mut(&id).ok_or(RepoError::ApiNotFound(id))?;
        api.method = method;
        api.path = input.path;
        api.permission_ids = permission_ids;
        api.updated_at = now_millis();
        Ok(api.clone())
    }

    async fn delete_api(&self, id: i64) -> RepoResult<()> {
        self.tables.write().apis.remove(&id);
        Ok(())
    }

    async fn get_api(&self, id: i64) -> RepoResult<Option<Api>> {
        Ok(self.tables.read().apis.get(&id).cloned())
    }

    async fn find_api_by_method_and_path(
        &self,
        method: &str,
        path: &str,
    ) -> RepoResult<Option<Api>> {
        let method = normalize_method(method);
        Ok(self.tables.read().api_by_route(&method, path).cloned())
    }

    async fn find_apis(&self, filter: &ApiFilter, page: PageQuery) -> RepoResult<(Vec<Api>, u64)> {
        let method = filter.method.as_deref().map(normalize_method);
        let prefix = filter.path_prefix.as_deref().unwrap_or_default();
        let mut apis: Vec<Api> = self
            .tables
            .read()
            .apis
            .values()
            .filter(|a| method.as_ref().is_none_or(|m| &a.method == m))
            .filter(|a| a.path.starts_with(prefix))
            .cloned()
            .collect();
        newest_first(&mut apis, |a| (a.created_at, a.id));
        Ok(paginate(apis, page))
    }

    async fn create_role(&self, input: RoleCreate, created_by: i64) -> RepoResult<Role> {
        let mut t = self.tables.write();
        let permission_ids = dedup_ids(&input.permission_ids);
        t.ensure_permissions(&permission_ids)?;

        let now = now_millis();
        let role = Role {
            id: t.next_id(),
            name: input.name,
            remark: input.remark,
            permission_ids,
            created_by,
            created_at: now,
            updated_at: now,
        };
        t.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update_role(&self, id: i64, input: RoleUpdate) -> RepoResult<Role> {
        let mut t = self.tables.write();
        if !t.roles.contains_key(&id) {
            return Err(RepoError::RoleNotFound(id));
        }
        let permission_ids = dedup_ids(&input.permission_ids);
        t.ensure_permissions(&permission_ids)?;

        let role = t.roles.get_mut(&id).ok_or(RepoError::RoleNotFound(id))?;
        role.name = input.name;
        role.remark = input.remark;
        role.permission_ids = permission_ids;
        role.updated_at = now_millis();
        Ok(role.clone())
    }

    async fn get_role(&self, id: i64) -> RepoResult<Option<Role>> {
        Ok(self.tables.read().roles.get(&id).cloned())
    }

    async fn find_roles(
        &self,
        name: Option<&str>,
        page: PageQuery,
    ) -> RepoResult<(Vec<Role>, u64)> {
        let needle = name.map(str::to_lowercase).unwrap_or_default();
        let mut roles: Vec<Role> = self
            .tables
            .read()
            .roles
            .values()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        newest_first(&mut roles, |r| (r.created_at, r.id));
        Ok(paginate(roles, page))
    }

    async fn replace_roles_for_user(&self, user_id: i64, role_ids: &[i64]) -> RepoResult<()> {
        let mut t = self.tables.write();
        let role_ids = dedup_ids(role_ids);
        if let Some(missing) = role_ids.iter().find(|id| !t.roles.contains_key(*id)) {
            return Err(RepoError::RoleNotFound(*missing));
        }

        t.user_roles.retain(|e| e.user_id != user_id);
        let now = now_millis();
        for role_id in role_ids {
            let id = t.next_id();
            t.user_roles.push(UserRole {
                id,
                user_id,
                role_id,
                created_at: now,
            });
        }
        Ok(())
    }

    async fn list_roles_for_user(&self, user_id: i64) -> RepoResult<Vec<Role>> {
        let t = self.tables.read();
        let mut edges: Vec<&UserRole> = t
            .user_roles
            .iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        edges.sort_by_key(|e| (e.created_at, e.id));
        Ok(edges
            .into_iter()
            .filter_map(|e| t.roles.get(&e.role_id).cloned())
            .collect())
    }
}
