//! Caller identity
//!
//! Sessions are authenticated upstream. A trusted gateway forwards the
//! admin user id in a header (`x-admin-user-id` by default); this module
//! turns it into a [`Principal`] through the [`IdentityStore`] and guards
//! routes with the authorization engine.

mod extractor;
mod identity;
mod middleware;

pub use extractor::CurrentUser;
pub use identity::{AdminUser, IdentityStore, MemoryIdentityStore, PgIdentityStore};
pub use middleware::{require_auth, require_permission, require_superuser};

pub const DEFAULT_USER_HEADER: &str = "x-admin-user-id";
