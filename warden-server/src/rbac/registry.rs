//! API registry
//!
//! Binds `(method, path)` routes to permission ids. Binding is only allowed
//! for routes the server actually serves, as reported by the [`RouteCatalog`].

use std::sync::Arc;

use shared::rbac::{Api, ApiCreate, ApiUpdate, PageQuery, RouteInfo, normalize_method};

use super::routes::RouteCatalog;
use crate::store::{ApiFilter, RbacStore, RepoError, RepoResult};

#[derive(Clone)]
pub struct ApiRegistry {
    store: Arc<dyn RbacStore>,
    routes: Arc<dyn RouteCatalog>,
}

impl ApiRegistry {
    pub fn new(store: Arc<dyn RbacStore>, routes: Arc<dyn RouteCatalog>) -> Self {
        Self { store, routes }
    }

    fn ensure_route(&self, method: &str, path: &str) -> RepoResult<()> {
        if self.routes.exists(method, path) {
            Ok(())
        } else {
            Err(RepoError::RouteNotFound {
                method: normalize_method(method),
                path: path.to_string(),
            })
        }
    }

    pub async fn create(&self, input: ApiCreate, created_by: i64) -> RepoResult<Api> {
        self.ensure_route(&input.method, &input.path)?;
        self.store.create_api(input, created_by).await
    }

    pub async fn update(&self, id: i64, input: ApiUpdate) -> RepoResult<Api> {
        self.ensure_route(&input.method, &input.path)?;
        self.store.update_api(id, input).await
    }

    pub async fn delete(&self, id: i64) -> RepoResult<()> {
        self.store.delete_api(id).await
    }

    pub async fn find(&self, filter: &ApiFilter, page: PageQuery) -> RepoResult<(Vec<Api>, u64)> {
        self.store.find_apis(filter, page).await
    }

    /// Routes the server serves, for building binding forms
    pub fn routes(&self, path_prefix: Option<&str>, method: Option<&str>) -> Vec<RouteInfo> {
        self.routes.list(path_prefix, method)
    }
}
