use serde::{Deserialize, Serialize};

use crate::model::Id;

/// Authenticated principal on whose behalf a request runs.
///
/// Resolved from the bearer credential by an `IdentityVerifier`; the
/// pipeline only ever looks at `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Id,
}

impl Principal {
    pub fn new(user_id: impl Into<Id>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// True when this principal owns a record with the given owner id
    pub fn owns(&self, owner_id: &str) -> bool {
        self.user_id == owner_id
    }
}
