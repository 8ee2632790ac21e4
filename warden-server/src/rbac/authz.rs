//! Authorization decisions
//!
//! Stateless: every decision is composed at read time from the caller's
//! roles and the permissions a route or code query requires.
//!
//! Policy
//! - nothing required: granted
//! - superuser: granted without looking at roles
//! - otherwise: granted when the caller holds *any* of the required ids

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::future::try_join_all;
use shared::error::AppError;
use shared::rbac::Principal;

use crate::security_log;
use crate::store::{RbacStore, RepoError, RepoResult};

/// Pure overlap test behind every non-superuser decision
pub fn grants(held: &BTreeSet<i64>, required: &BTreeSet<i64>) -> bool {
    required.is_empty() || !held.is_disjoint(required)
}

#[derive(Clone)]
pub struct Authorizer {
    store: Arc<dyn RbacStore>,
}

impl Authorizer {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self { store }
    }

    pub async fn check_permission(
        &self,
        principal: &Principal,
        required: &BTreeSet<i64>,
    ) -> RepoResult<bool> {
        if required.is_empty() || principal.is_superuser {
            return Ok(true);
        }
        let held = self.store.permission_ids_for_user(principal.user_id).await?;
        Ok(grants(&held, required))
    }

    /// Permission ids guarding `(method, path)`; empty for unregistered routes
    pub async fn resolve_required_permissions(
        &self,
        method: &str,
        path: &str,
    ) -> RepoResult<BTreeSet<i64>> {
        Ok(self
            .store
            .find_api_by_method_and_path(method, path)
            .await?
            .map(|api| api.permission_ids.into_iter().collect())
            .unwrap_or_default())
    }

    /// Map each dotted code to whether the caller holds it.
    /// Codes that do not resolve map to `false`.
    pub async fn check_permissions_by_full_code(
        &self,
        principal: &Principal,
        codes: &[String],
    ) -> RepoResult<BTreeMap<String, bool>> {
        if principal.is_superuser {
            return Ok(codes.iter().map(|c| (c.clone(), true)).collect());
        }

        let resolved = try_join_all(codes.iter().map(|code| async move {
            match self.store.get_permission_by_full_code(code).await {
                Ok(permission) => Ok((code.clone(), Some(permission.id))),
                Err(RepoError::FullCodeNotFound(_)) => Ok((code.clone(), None)),
                Err(e) => Err(e),
            }
        }))
        .await?;

        if resolved.iter().all(|(_, id)| id.is_none()) {
            return Ok(resolved.into_iter().map(|(code, _)| (code, false)).collect());
        }

        let held = self.store.permission_ids_for_user(principal.user_id).await?;
        Ok(resolved
            .into_iter()
            .map(|(code, id)| {
                let granted = id.is_some_and(|id| held.contains(&id));
                (code, granted)
            })
            .collect())
    }

    /// Resolve the route's requirements and check them, `Forbidden` on denial.
    pub async fn authorize_route(
        &self,
        principal: &Principal,
        method: &str,
        path: &str,
    ) -> Result<(), AppError> {
        let required = self.resolve_required_permissions(method, path).await?;
        if self.check_permission(principal, &required).await? {
            tracing::debug!(
                user_id = principal.user_id,
                method,
                path,
                required = required.len(),
                "Route authorized"
            );
            return Ok(());
        }

        security_log!(
            WARN,
            "permission_denied",
            user_id = principal.user_id,
            method,
            path
        );
        Err(AppError::forbidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[i64]) -> BTreeSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_grants_any_overlap() {
        assert!(!grants(&set(&[1, 2]), &set(&[3, 4])));
        assert!(grants(&set(&[1, 2]), &set(&[2, 5])));
    }

    #[test]
    fn test_grants_empty_requirement() {
        assert!(grants(&set(&[]), &set(&[])));
        assert!(grants(&set(&[1]), &set(&[])));
    }

    #[test]
    fn test_grants_requires_overlap_not_containment() {
        assert!(grants(&set(&[7]), &set(&[7, 8, 9])));
        assert!(!grants(&set(&[]), &set(&[7])));
    }
}
