//! Authenticated caller

use serde::{Deserialize, Serialize};

/// Caller identity as yielded by the identity store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub is_superuser: bool,
}

impl Principal {
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            is_superuser: false,
        }
    }

    pub fn superuser(user_id: i64) -> Self {
        Self {
            user_id,
            is_superuser: true,
        }
    }
}
