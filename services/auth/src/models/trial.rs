//! Trial activation code model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A single-use promotional code granting time-limited admin access.
///
/// `used` flips false to true exactly once; a used or expired code is
/// permanently rejected.
#[derive(Debug, Clone, FromRow)]
pub struct TrialCode {
    pub code: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
}
