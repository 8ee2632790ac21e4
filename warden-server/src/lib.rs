//! Warden Server - 后台管理 RBAC 授权服务
//!
//! # 架构概述
//!
//! - **权限树** (`store`, `rbac::tree`): 分层权限码, 兄弟节点稠密排序
//! - **接口绑定** (`rbac::registry`): `(method, path)` 到权限的映射
//! - **授权决策** (`rbac::authz`): 任一权限命中即放行, 超级管理员直通
//! - **HTTP API** (`api`): 管理接口与路由守卫
//!
//! # 模块结构
//!
//! ```text
//! warden-server/src/
//! ├── api/       # HTTP 路由和处理器
//! ├── auth/      # 调用方身份, 路由守卫
//! ├── rbac/      # 树遍历、排序、授权
//! ├── store/     # RbacStore (PostgreSQL / 内存)
//! ├── config.rs  # 环境变量配置
//! ├── logger.rs  # tracing 初始化
//! └── state.rs   # AppState
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod logger;
pub mod rbac;
pub mod state;
pub mod store;

pub use config::{Config, StoreKind};
pub use rbac::{ApiRegistry, Authorizer};
pub use state::AppState;
pub use store::{MemoryStore, PgStore, RbacStore, RepoError, RepoResult};

// Security logging macro - target "security", 支持 tracing 字段语法
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(target: "security", event = $event, $($arg)*);
    };
    (ERROR, $event:expr, $($arg:tt)*) => {
        tracing::error!(target: "security", event = $event, $($arg)*);
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(target: "security", event = $event, $($arg)*);
    };
}
