use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PasswordResetToken;

/// Insert a fresh token row. Both timestamps come from the caller's single
/// clock read so the validity window is exactly expires_at - created_at.
pub async fn create(
    pool: &PgPool,
    account_id: Uuid,
    token: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<PasswordResetToken, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "INSERT INTO password_reset_tokens (account_id, token, created_at, expires_at)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(account_id)
    .bind(token)
    .bind(created_at)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// A token in the PENDING state: matching value, unconsumed, unexpired
/// against the database clock.
pub async fn find_valid<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    token: &str,
) -> Result<Option<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "SELECT * FROM password_reset_tokens
         WHERE token = $1 AND used = false AND expires_at > now()",
    )
    .bind(token)
    .fetch_optional(executor)
    .await
}

/// Resolve a token row regardless of state. Consume uses this to learn
/// which account to lock before re-checking validity.
pub async fn find_by_token<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    token: &str,
) -> Result<Option<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "SELECT * FROM password_reset_tokens WHERE token = $1",
    )
    .bind(token)
    .fetch_optional(executor)
    .await
}

pub async fn mark_used<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE password_reset_tokens SET used = true WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Sibling invalidation: burn every outstanding token of the account in one
/// statement. Returns the number of rows flipped.
pub async fn invalidate_all_for_account<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    account_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE password_reset_tokens SET used = true
         WHERE account_id = $1 AND used = false",
    )
    .bind(account_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// All tokens ever issued for an account, newest first.
pub async fn list_for_account(
    pool: &PgPool,
    account_id: Uuid,
) -> Result<Vec<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "SELECT * FROM password_reset_tokens
         WHERE account_id = $1 ORDER BY created_at DESC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await
}
