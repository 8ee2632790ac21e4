//! Authorization core
//!
//! - [`tree`]: flat-row permission forest traversal
//! - [`sort`]: dense sibling ordering
//! - [`routes`]: route introspection seam
//! - [`registry`]: route to permission bindings
//! - [`authz`]: grant/deny decisions

pub mod authz;
pub mod registry;
pub mod routes;
pub mod sort;
pub mod tree;

pub use authz::Authorizer;
pub use registry::ApiRegistry;
pub use routes::{RouteCatalog, StaticRouteCatalog};
