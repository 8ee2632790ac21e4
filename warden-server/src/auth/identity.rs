//! Identity store seam

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::rbac::Principal;
use sqlx::PgPool;

use crate::store::RepoResult;
use crate::store::seed::{DEFAULT_ADMIN_ID, DEFAULT_ADMIN_USERNAME};

/// Admin account as seen by the authorization engine
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl AdminUser {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            is_superuser: self.is_superuser,
        }
    }
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_user(&self, user_id: i64) -> RepoResult<Option<AdminUser>>;
}

/// Reads the `admin_users` table
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_user(&self, user_id: i64) -> RepoResult<Option<AdminUser>> {
        Ok(sqlx::query_as(
            "SELECT id, username, is_superuser, status = 'active' AS is_active FROM admin_users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    users: Arc<RwLock<HashMap<i64, AdminUser>>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds only the bootstrap superuser
    pub fn seeded() -> Self {
        Self::new().with_user(DEFAULT_ADMIN_ID, DEFAULT_ADMIN_USERNAME, true)
    }

    pub fn insert(&self, user: AdminUser) {
        self.users.write().insert(user.id, user);
    }

    /// Convenience for fixtures: an active account
    pub fn with_user(self, id: i64, username: &str, is_superuser: bool) -> Self {
        self.insert(AdminUser {
            id,
            username: username.to_string(),
            is_superuser,
            is_active: true,
        });
        self
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_user(&self, user_id: i64) -> RepoResult<Option<AdminUser>> {
        Ok(self.users.read().get(&user_id).cloned())
    }
}
