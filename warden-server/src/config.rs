//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

use crate::auth::DEFAULT_USER_HEADER;

/// Which [`RbacStore`](crate::store::RbacStore) backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => bail!("unknown WARDEN_STORE '{other}', expected postgres or memory"),
        }
    }
}

/// Server configuration
///
/// | 环境变量 | 默认值 |
/// |----------|--------|
/// | WARDEN_HTTP_ADDR | 0.0.0.0:8080 |
/// | WARDEN_STORE | postgres |
/// | DATABASE_URL | (required for postgres) |
/// | WARDEN_DB_MAX_CONNECTIONS | 10 |
/// | WARDEN_USER_HEADER | x-admin-user-id |
/// | WARDEN_LOG_DIR | (stdout only) |
/// | WARDEN_LOG_JSON | false |
#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: SocketAddr,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub user_header: String,
    pub log_dir: Option<PathBuf>,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            store: StoreKind::Postgres,
            database_url: None,
            db_max_connections: 10,
            user_header: DEFAULT_USER_HEADER.to_string(),
            log_dir: None,
            log_json: false,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let http_addr = match var("WARDEN_HTTP_ADDR") {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("WARDEN_HTTP_ADDR '{addr}' is not a socket address"))?,
            None => defaults.http_addr,
        };
        let store = match var("WARDEN_STORE") {
            Some(kind) => kind.parse()?,
            None => defaults.store,
        };
        let db_max_connections = match var("WARDEN_DB_MAX_CONNECTIONS") {
            Some(n) => n
                .parse()
                .with_context(|| format!("WARDEN_DB_MAX_CONNECTIONS '{n}' is not a number"))?,
            None => defaults.db_max_connections,
        };
        let user_header = var("WARDEN_USER_HEADER")
            .map(|h| h.trim().to_ascii_lowercase())
            .unwrap_or(defaults.user_header);
        http::HeaderName::from_bytes(user_header.as_bytes())
            .with_context(|| format!("WARDEN_USER_HEADER '{user_header}' is not a header name"))?;

        let database_url = var("DATABASE_URL");
        if store == StoreKind::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when WARDEN_STORE=postgres");
        }

        Ok(Self {
            http_addr,
            store,
            database_url,
            db_max_connections,
            user_header,
            log_dir: var("WARDEN_LOG_DIR").map(PathBuf::from),
            log_json: var("WARDEN_LOG_JSON").is_some_and(|v| parse_bool(&v)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_memory_store_needs_no_database() {
        let config = load(&[("WARDEN_STORE", "memory")]).unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.user_header, "x-admin-user-id");
        assert!(!config.log_json);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(load(&[]).is_err());
        let config = load(&[("DATABASE_URL", "postgres://localhost/warden")]).unwrap();
        assert_eq!(config.store, StoreKind::Postgres);
        assert_eq!(config.db_max_connections, 10);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("WARDEN_STORE", "memory"),
            ("WARDEN_HTTP_ADDR", "127.0.0.1:9000"),
            ("WARDEN_USER_HEADER", "X-User"),
            ("WARDEN_LOG_JSON", "true"),
            ("WARDEN_LOG_DIR", "/var/log/warden"),
        ])
        .unwrap();
        assert_eq!(config.http_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.user_header, "x-user");
        assert!(config.log_json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/warden")));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load(&[("WARDEN_STORE", "redis")]).is_err());
        assert!(load(&[("WARDEN_STORE", "memory"), ("WARDEN_HTTP_ADDR", "nope")]).is_err());
        assert!(load(&[("WARDEN_STORE", "memory"), ("WARDEN_USER_HEADER", "bad header")]).is_err());
    }
}
