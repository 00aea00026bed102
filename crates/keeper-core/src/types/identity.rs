//! Authenticated caller identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The user on whose behalf a request runs, as resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Owner id stamped onto every data operation.
    pub user_id: String,

    /// Token issue time.
    pub issued_at: DateTime<Utc>,

    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

impl CallerIdentity {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
