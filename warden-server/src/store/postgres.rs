//! PostgreSQL implementation of [`RbacStore`]
//!
//! Each mutating call runs in one transaction. Lock order is always
//! advisory lock first, then row locks:
//! - a sibling group (rows sharing `parent_id`) is serialized with
//!   `pg_advisory_xact_lock(SIBLING_LOCK, parent_id)` before any `sort` change
//! - re-parenting takes the tree-wide `TREE_LOCK` so two moves can never
//!   pass their cycle checks against the same stale snapshot
//! - all edges of one user are serialized with `USER_ROLE_LOCK`
//!
//! `permission_ids` columns are `BIGINT[]` with GIN indexes and are queried
//! with `&&` (overlap).

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use shared::rbac::{
    Api, ApiCreate, ApiUpdate, PageQuery, Permission, PermissionCreate, PermissionUpdate,
    ROOT_PARENT_ID, Role, RoleCreate, RoleUpdate, TreeNode, dedup_ids, normalize_method,
};
use shared::util::now_millis;
use sqlx::{PgConnection, PgPool};

use super::{ApiFilter, RbacStore, RepoError, RepoResult};
use crate::rbac::sort::{SortShift, clamp_target, next_sort};
use crate::rbac::tree::{LevelWalk, assemble_subtree};

const SIBLING_LOCK: i32 = 0x5742_0001;
const TREE_LOCK: i32 = 0x5742_0002;
const USER_ROLE_LOCK: i32 = 0x5742_0003;

/// Retries when a node is re-parented while we wait for its sibling lock
const MAX_LOCK_ATTEMPTS: usize = 3;

macro_rules! select_permissions {
    ($tail:literal) => {
        concat!(
            "SELECT id, name, code, parent_id, remark, sort, created_by, created_at, updated_at FROM permissions ",
            $tail
        )
    };
}

macro_rules! select_apis {
    ($tail:literal) => {
        concat!(
            "SELECT id, method, path, permission_ids, created_by, created_at, updated_at FROM apis ",
            $tail
        )
    };
}

macro_rules! select_roles {
    ($tail:literal) => {
        concat!(
            "SELECT id, name, remark, permission_ids, created_by, created_at, updated_at FROM roles ",
            $tail
        )
    };
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Fold an id into the int4 key space of two-key advisory locks
fn lock_key(id: i64) -> i32 {
    (id.rem_euclid(i64::from(i32::MAX))) as i32
}

async fn advisory_lock(conn: &mut PgConnection, namespace: i32, key: i32) -> RepoResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(namespace)
        .bind(key)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Lock the sibling group of `id`, then the row itself.
///
/// `None` when the row does not exist.
async fn lock_in_group(conn: &mut PgConnection, id: i64) -> RepoResult<Option<Permission>> {
    for _ in 0..MAX_LOCK_ATTEMPTS {
        let parent: Option<(i64,)> = sqlx::query_as("SELECT parent_id FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        let Some((parent_id,)) = parent else {
            return Ok(None);
        };

        advisory_lock(conn, SIBLING_LOCK, lock_key(parent_id)).await?;

        let node: Option<Permission> =
            sqlx::query_as(select_permissions!("WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        match node {
            None => return Ok(None),
            Some(node) if node.parent_id == parent_id => return Ok(Some(node)),
            Some(_) => continue,
        }
    }
    Err(RepoError::Database(format!(
        "permission {id} was re-parented repeatedly while waiting for its sibling lock"
    )))
}

/// Breadth-first walk of every descendant id of `root`
async fn walk_descendants(conn: &mut PgConnection, root: i64, for_update: bool) -> RepoResult<LevelWalk> {
    let sql = if for_update {
        "SELECT id FROM permissions WHERE parent_id = ANY($1) ORDER BY id FOR UPDATE"
    } else {
        "SELECT id FROM permissions WHERE parent_id = ANY($1)"
    };
    let mut walk = LevelWalk::new(root);
    while !walk.is_done() {
        let level: Vec<(i64,)> = sqlx::query_as(sql)
            .bind(walk.frontier())
            .fetch_all(&mut *conn)
            .await?;
        walk.advance(level.into_iter().map(|(id,)| id));
    }
    Ok(walk)
}

async fn missing_in(conn: &mut PgConnection, table_ids: &str, ids: &[i64]) -> RepoResult<Vec<i64>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let found: Vec<(i64,)> = sqlx::query_as(table_ids)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;
    let found: HashSet<i64> = found.into_iter().map(|(id,)| id).collect();
    Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
}

async fn ensure_permissions(conn: &mut PgConnection, ids: &[i64]) -> RepoResult<()> {
    let missing = missing_in(conn, "SELECT id FROM permissions WHERE id = ANY($1)", ids).await?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RepoError::PermissionsMissing(missing))
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RbacStore for PgStore {
    async fn create_permission(
        &self,
        input: PermissionCreate,
        created_by: i64,
    ) -> RepoResult<Permission> {
        let mut tx = self.pool.begin().await?;
        let parent_id = input.parent_id;

        if parent_id != ROOT_PARENT_ID {
            let parent: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM permissions WHERE id = $1 FOR SHARE")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if parent.is_none() {
                return Err(RepoError::ParentNotFound(parent_id));
            }
        }
        advisory_lock(&mut tx, SIBLING_LOCK, lock_key(parent_id)).await?;

        let (max,): (Option<i32>,) =
            sqlx::query_as("SELECT MAX(sort) FROM permissions WHERE parent_id = $1")
                .bind(parent_id)
                .fetch_one(&mut *tx)
                .await?;

        let now = now_millis();
        let created: Permission = sqlx::query_as(
            r#"
            INSERT INTO permissions (name, code, parent_id, remark, sort, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id, name, code, parent_id, remark, sort, created_by, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.code)
        .bind(parent_id)
        .bind(&input.remark)
        .bind(next_sort(max))
        .bind(created_by)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::CodeDuplicated {
                    parent_id,
                    code: input.code.clone(),
                }
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_permission(&self, id: i64) -> RepoResult<Option<Permission>> {
        Ok(sqlx::query_as(select_permissions!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_permission_by_code(
        &self,
        code: &str,
        parent_id: i64,
    ) -> RepoResult<Option<Permission>> {
        Ok(
            sqlx::query_as(select_permissions!("WHERE parent_id = $1 AND code = $2"))
                .bind(parent_id)
                .bind(code)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_children(&self, parent_id: i64) -> RepoResult<Vec<Permission>> {
        Ok(
            sqlx::query_as(select_permissions!("WHERE parent_id = $1 ORDER BY sort, id"))
                .bind(parent_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn list_subtree(&self, parent_id: i64) -> RepoResult<Vec<TreeNode>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut rows = Vec::new();
        let mut walk = LevelWalk::new(parent_id);
        while !walk.is_done() {
            let level: Vec<Permission> =
                sqlx::query_as(select_permissions!("WHERE parent_id = ANY($1)"))
                    .bind(walk.frontier())
                    .fetch_all(&mut *tx)
                    .await?;
            walk.advance(level.iter().map(|p| p.id));
            rows.extend(level);
        }
        tx.commit().await?;
        Ok(assemble_subtree(parent_id, rows))
    }

    async fn list_ancestors(&self, id: i64) -> RepoResult<Vec<Permission>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = id;
        while cursor != ROOT_PARENT_ID && seen.insert(cursor) {
            let node: Permission = sqlx::query_as(select_permissions!("WHERE id = $1"))
                .bind(cursor)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepoError::PermissionNotFound(cursor))?;
            cursor = node.parent_id;
            chain.push(node);
        }
        tx.commit().await?;
        chain.reverse();
        Ok(chain)
    }

    async fn update_permission(&self, id: i64, input: PermissionUpdate) -> RepoResult<Permission> {
        let mut tx = self.pool.begin().await?;
        advisory_lock(&mut tx, TREE_LOCK, 0).await?;

        let current: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM permissions WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if current.is_none() {
            return Err(RepoError::PermissionNotFound(id));
        }

        let parent_id = input.parent_id;
        if parent_id != ROOT_PARENT_ID {
            if parent_id == id {
                return Err(RepoError::CyclicParent { id, parent_id });
            }
            let parent: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM permissions WHERE id = $1 FOR SHARE")
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if parent.is_none() {
                return Err(RepoError::ParentNotFound(parent_id));
            }
            if walk_descendants(&mut tx, id, false).await?.contains(parent_id) {
                return Err(RepoError::CyclicParent { id, parent_id });
            }
        }

        let updated: Permission = sqlx::query_as(
            r#"
            UPDATE permissions
            SET name = $1, code = $2, remark = $3, parent_id = $4, updated_at = $5
            WHERE id = $6
            RETURNING id, name, code, parent_id, remark, sort, created_by, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.remark)
        .bind(parent_id)
        .bind(now_millis())
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::CodeDuplicated {
                    parent_id,
                    code: input.code.clone(),
                }
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn reorder_permission(&self, id: i64, new_sort: i32) -> RepoResult<Permission> {
        let mut tx = self.pool.begin().await?;
        let node = lock_in_group(&mut tx, id)
            .await?
            .ok_or(RepoError::PermissionNotFound(id))?;

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM permissions WHERE parent_id = $1")
                .bind(node.parent_id)
                .fetch_one(&mut *tx)
                .await?;
        let target = clamp_target(new_sort, usize::try_from(count).unwrap_or(0));

        let Some(shift) = SortShift::for_move(node.sort, target) else {
            tx.commit().await?;
            return Ok(node);
        };

        let now = now_millis();
        sqlx::query(
            r#"
            UPDATE permissions SET sort = sort + $1, updated_at = $2
            WHERE parent_id = $3 AND id <> $4 AND sort BETWEEN $5 AND $6
            "#,
        )
        .bind(shift.delta)
        .bind(now)
        .bind(node.parent_id)
        .bind(id)
        .bind(shift.lo())
        .bind(shift.hi())
        .execute(&mut *tx)
        .await?;

        let moved: Permission = sqlx::query_as(
            r#"
            UPDATE permissions SET sort = $1, updated_at = $2 WHERE id = $3
            RETURNING id, name, code, parent_id, remark, sort, created_by, created_at, updated_at
            "#,
        )
        .bind(target)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(moved)
    }

    async fn delete_permission(&self, id: i64) -> RepoResult<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let Some(node) = lock_in_group(&mut tx, id).await? else {
            tx.commit().await?;
            return Ok(Vec::new());
        };

        let mut removed = walk_descendants(&mut tx, id, true).await?.into_post_order();
        removed.push(id);

        sqlx::query("DELETE FROM permissions WHERE id = ANY($1)")
            .bind(&removed)
            .execute(&mut *tx)
            .await?;

        let now = now_millis();
        let close_gap = SortShift::for_removal(node.sort);
        sqlx::query(
            "UPDATE permissions SET sort = sort + $1, updated_at = $2 WHERE parent_id = $3 AND sort >= $4",
        )
        .bind(close_gap.delta)
        .bind(now)
        .bind(node.parent_id)
        .bind(close_gap.lo())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE apis
            SET permission_ids = ARRAY(SELECT p FROM unnest(permission_ids) AS p WHERE p <> ALL($1)),
                updated_at = $2
            WHERE permission_ids && $1
            "#,
        )
        .bind(&removed)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn create_api(&self, input: ApiCreate, created_by: i64) -> RepoResult<Api> {
        let method = normalize_method(&input.method);
        let permission_ids = dedup_ids(&input.permission_ids);
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM apis WHERE method = $1 AND path = $2")
                .bind(&method)
                .bind(&input.path)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(RepoError::ApiExists {
                method,
                path: input.path,
            });
        }
        ensure_permissions(&mut tx, &permission_ids).await?;

        let now = now_millis();
        let api: Api = sqlx::query_as(
            r#"
            INSERT INTO apis (method, path, permission_ids, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, method, path, permission_ids, created_by, created_at, updated_at
            "#,
        )
        .bind(&method)
        .bind(&input.path)
        .bind(&permission_ids)
        .bind(created_by)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::ApiExists {
                    method: method.clone(),
                    path: input.path.clone(),
                }
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(api)
    }

    async fn update_api(&self, id: i64, input: ApiUpdate) -> RepoResult<Api> {
        let method = normalize_method(&input.method);
        let permission_ids = dedup_ids(&input.permission_ids);
        let mut tx = self.pool.begin().await?;

        let other: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM apis WHERE method = $1 AND path = $2 AND id <> $3")
                .bind(&method)
                .bind(&input.path)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if other.is_some() {
            return Err(RepoError::ApiExists {
                method,
                path: input.path,
            });
        }

        let current: Option<(i64,)> = sqlx::query_as("SELECT id FROM apis WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if current.is_none() {
            return Err(RepoError::ApiNotFound(id));
        }
        ensure_permissions(&mut tx, &permission_ids).await?;

        let api: Api = sqlx::query_as(
            r#"
            UPDATE apis SET method = $1, path = $2, permission_ids = $3, updated_at = $4
            WHERE id = $5
            RETURNING id, method, path, permission_ids, created_by, created_at, updated_at
            "#,
        )
        .bind(&method)
        .bind(&input.path)
        .bind(&permission_ids)
        .bind(now_millis())
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::ApiExists {
                    method: method.clone(),
                    path: input.path.clone(),
                }
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(api)
    }

    async fn delete_api(&self, id: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM apis WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_api(&self, id: i64) -> RepoResult<Option<Api>> {
        Ok(sqlx::query_as(select_apis!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_api_by_method_and_path(
        &self,
        method: &str,
        path: &str,
    ) -> RepoResult<Option<Api>> {
        Ok(sqlx::query_as(select_apis!("WHERE method = $1 AND path = $2"))
            .bind(normalize_method(method))
            .bind(path)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_apis(&self, filter: &ApiFilter, page: PageQuery) -> RepoResult<(Vec<Api>, u64)> {
        let method = filter
            .method
            .as_deref()
            .map(normalize_method)
            .filter(|m| !m.is_empty());
        let prefix = filter.path_prefix.as_deref().filter(|p| !p.is_empty());

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM apis
            WHERE ($1::text IS NULL OR method = $1)
              AND ($2::text IS NULL OR left(path, length($2)) = $2)
            "#,
        )
        .bind(&method)
        .bind(prefix)
        .fetch_one(&self.pool)
        .await?;

        let apis: Vec<Api> = sqlx::query_as(select_apis!(
            r#"
            WHERE ($1::text IS NULL OR method = $1)
              AND ($2::text IS NULL OR left(path, length($2)) = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&method)
        .bind(prefix)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((apis, total.max(0) as u64))
    }

    async fn create_role(&self, input: RoleCreate, created_by: i64) -> RepoResult<Role> {
        let permission_ids = dedup_ids(&input.permission_ids);
        let mut tx = self.pool.begin().await?;
        ensure_permissions(&mut tx, &permission_ids).await?;

        let now = now_millis();
        let role: Role = sqlx::query_as(
            r#"
            INSERT INTO roles (name, remark, permission_ids, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, name, remark, permission_ids, created_by, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.remark)
        .bind(&permission_ids)
        .bind(created_by)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(role)
    }

    async fn update_role(&self, id: i64, input: RoleUpdate) -> RepoResult<Role> {
        let permission_ids = dedup_ids(&input.permission_ids);
        let mut tx = self.pool.begin().await?;

        let current: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if current.is_none() {
            return Err(RepoError::RoleNotFound(id));
        }
        ensure_permissions(&mut tx, &permission_ids).await?;

        let role: Role = sqlx::query_as(
            r#"
            UPDATE roles SET name = $1, remark = $2, permission_ids = $3, updated_at = $4
            WHERE id = $5
            RETURNING id, name, remark, permission_ids, created_by, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.remark)
        .bind(&permission_ids)
        .bind(now_millis())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(role)
    }

    async fn get_role(&self, id: i64) -> RepoResult<Option<Role>> {
        Ok(sqlx::query_as(select_roles!("WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_roles(
        &self,
        name: Option<&str>,
        page: PageQuery,
    ) -> RepoResult<(Vec<Role>, u64)> {
        let name = name.filter(|n| !n.is_empty());

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM roles WHERE ($1::text IS NULL OR strpos(lower(name), lower($1)) > 0)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        let roles: Vec<Role> = sqlx::query_as(select_roles!(
            r#"
            WHERE ($1::text IS NULL OR strpos(lower(name), lower($1)) > 0)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(name)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((roles, total.max(0) as u64))
    }

    async fn replace_roles_for_user(&self, user_id: i64, role_ids: &[i64]) -> RepoResult<()> {
        let role_ids = dedup_ids(role_ids);
        let mut tx = self.pool.begin().await?;
        advisory_lock(&mut tx, USER_ROLE_LOCK, lock_key(user_id)).await?;

        if !role_ids.is_empty() {
            let found: Vec<(i64,)> =
                sqlx::query_as("SELECT id FROM roles WHERE id = ANY($1) FOR SHARE")
                    .bind(&role_ids)
                    .fetch_all(&mut *tx)
                    .await?;
            let found: HashSet<i64> = found.into_iter().map(|(id,)| id).collect();
            if let Some(missing) = role_ids.iter().find(|id| !found.contains(*id)) {
                return Err(RepoError::RoleNotFound(*missing));
            }
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !role_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id, created_at)
                SELECT $1, r.role_id, $3
                FROM UNNEST($2::bigint[]) WITH ORDINALITY AS r(role_id, ord)
                ORDER BY r.ord
                "#,
            )
            .bind(user_id)
            .bind(&role_ids)
            .bind(now_millis())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_roles_for_user(&self, user_id: i64) -> RepoResult<Vec<Role>> {
        Ok(sqlx::query_as(
            r#"
            SELECT r.id, r.name, r.remark, r.permission_ids, r.created_by, r.created_at, r.updated_at
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY ur.created_at, ur.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn permission_ids_for_user(&self, user_id: i64) -> RepoResult<BTreeSet<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT unnest(r.permission_ids)
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
