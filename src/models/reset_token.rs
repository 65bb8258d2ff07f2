use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-use reset token row. `used` flips false→true exactly once;
/// expiry is derived by comparing `expires_at` to the database clock at
/// read time, never stored. Rows outlive consumption for history.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub account_id: Uuid,
    // The raw token is a bearer credential; keep it out of serialized output.
    #[serde(skip_serializing)]
    pub token: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
