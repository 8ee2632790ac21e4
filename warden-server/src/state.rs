//! Application state

use std::sync::Arc;

use anyhow::Context;
use http::HeaderName;

use crate::api::ROUTES;
use crate::auth::{IdentityStore, MemoryIdentityStore, PgIdentityStore};
use crate::config::{Config, StoreKind};
use crate::rbac::{ApiRegistry, Authorizer, RouteCatalog, StaticRouteCatalog};
use crate::store::{MemoryStore, PgStore, RbacStore};

/// Shared by every handler and middleware; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RbacStore>,
    pub identity: Arc<dyn IdentityStore>,
    pub authorizer: Authorizer,
    pub registry: ApiRegistry,
    pub user_header: HeaderName,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RbacStore>,
        identity: Arc<dyn IdentityStore>,
        routes: Arc<dyn RouteCatalog>,
        user_header: HeaderName,
    ) -> Self {
        Self {
            authorizer: Authorizer::new(store.clone()),
            registry: ApiRegistry::new(store.clone(), routes),
            store,
            identity,
            user_header,
        }
    }

    /// State over the server's own route table
    pub fn with_stores(store: Arc<dyn RbacStore>, identity: Arc<dyn IdentityStore>) -> Self {
        Self::new(
            store,
            identity,
            Arc::new(StaticRouteCatalog::from_table(ROUTES)),
            HeaderName::from_static(crate::auth::DEFAULT_USER_HEADER),
        )
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (store, identity): (Arc<dyn RbacStore>, Arc<dyn IdentityStore>) = match config.store {
            StoreKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let store = PgStore::connect(url, config.db_max_connections).await?;
                let identity = PgIdentityStore::new(store.pool().clone());
                (Arc::new(store), Arc::new(identity))
            }
            StoreKind::Memory => {
                tracing::warn!("Using the in-memory store with the default tree, state is lost on restart");
                (
                    Arc::new(MemoryStore::seeded()),
                    Arc::new(MemoryIdentityStore::seeded()),
                )
            }
        };

        let user_header = HeaderName::from_bytes(config.user_header.as_bytes())
            .context("invalid user header name")?;
        Ok(Self::new(
            store,
            identity,
            Arc::new(StaticRouteCatalog::from_table(ROUTES)),
            user_header,
        ))
    }
}
