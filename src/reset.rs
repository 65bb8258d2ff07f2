//! One-time password-reset token lifecycle: issue, verify, consume.
//!
//! No state lives in-process; every operation re-reads Postgres, and the
//! only multi-step mutation (consume) runs inside a single transaction.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::email::{templates, Mailer};
use crate::password;

/// Taxonomy every internal failure is folded into before it crosses the
/// operation boundary. Callers match on this; raw driver detail stays in
/// the message and is only ever logged, never sent to clients.
#[derive(Debug)]
pub enum ResetError {
    /// Malformed or missing input.
    Validation(String),
    /// Token not found, expired, or already used; deliberately one bucket.
    TokenInvalid,
    /// Store unreachable, query or transaction failure.
    Storage(String),
    /// Mail dispatch failed after the token was durably stored.
    Delivery(String),
}

impl std::fmt::Display for ResetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetError::Validation(msg) => write!(f, "Validation: {msg}"),
            ResetError::TokenInvalid => write!(f, "Invalid or expired token"),
            ResetError::Storage(msg) => write!(f, "Storage error: {msg}"),
            ResetError::Delivery(msg) => write!(f, "Delivery error: {msg}"),
        }
    }
}

impl From<sqlx::Error> for ResetError {
    fn from(err: sqlx::Error) -> Self {
        ResetError::Storage(err.to_string())
    }
}

/// What issuance actually did. The HTTP layer answers identically for both
/// variants; the distinction exists for internal logging and audit.
#[derive(Debug)]
pub enum IssueOutcome {
    Sent { account_id: Uuid },
    UnknownEmail,
}

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Issue a reset token for the account registered under `email` and hand
/// the reset link to the mailer.
///
/// Unknown emails succeed without creating anything so callers can keep
/// their response indistinguishable from the known-email case. A delivery
/// failure is reported as `Delivery`, but only after the token row is
/// durably stored; the link stays redeemable.
pub async fn issue(
    pool: &PgPool,
    mailer: Option<&dyn Mailer>,
    base_url: &str,
    email: &str,
) -> Result<IssueOutcome, ResetError> {
    if email.is_empty() {
        return Err(ResetError::Validation("Email is required".to_string()));
    }

    let Some(account) = db::accounts::find_by_email(pool, email).await? else {
        return Ok(IssueOutcome::UnknownEmail);
    };

    let token = generate_token();
    let now = Utc::now();
    db::reset_tokens::create(pool, account.id, &token, now, now + Duration::hours(1)).await?;

    let reset_url = format!("{base_url}/reset-password?token={token}");
    match mailer {
        Some(mailer) => {
            let html = templates::render_password_reset(&account.name, &reset_url);
            mailer
                .send(&account.email, "Reset your password - Campestre Dogs", &html)
                .await
                .map_err(ResetError::Delivery)?;
        }
        None => {
            tracing::warn!(
                "SMTP not configured. Password reset token for {}: {token}",
                account.email
            );
        }
    }

    Ok(IssueOutcome::Sent {
        account_id: account.id,
    })
}

/// Is `token` currently redeemable? Read-only and idempotent: safe to call
/// on page load and again on submit.
pub async fn verify(pool: &PgPool, token: &str) -> Result<bool, ResetError> {
    if token.is_empty() {
        return Err(ResetError::Validation("Token is required".to_string()));
    }

    let reset = db::reset_tokens::find_valid(pool, token).await?;
    Ok(reset.is_some())
}

/// Redeem `token`: replace the account credential and burn the token plus
/// every other outstanding token of the same account, atomically.
///
/// Returns the owning account id on success.
pub async fn consume(pool: &PgPool, token: &str, new_password: &str) -> Result<Uuid, ResetError> {
    if token.is_empty() || new_password.is_empty() {
        return Err(ResetError::Validation(
            "Token and new password are required".to_string(),
        ));
    }
    if new_password.len() < 6 {
        return Err(ResetError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    // Cheap lock-free pre-check so dead tokens fail before the Argon2 work.
    if db::reset_tokens::find_valid(pool, token).await?.is_none() {
        return Err(ResetError::TokenInvalid);
    }

    let password_hash = password::hash(new_password).map_err(ResetError::Storage)?;

    // Everything below is one transaction; any early return drops `tx`,
    // which rolls the whole thing back.
    let mut tx = pool.begin().await?;

    let Some(pending) = db::reset_tokens::find_by_token(&mut *tx, token).await? else {
        return Err(ResetError::TokenInvalid);
    };

    // Lock the account row first. Concurrent consumes for the same account
    // queue here, and token rows are only written while this lock is held,
    // so the two-tokens race resolves without deadlock: the loser re-checks
    // below and finds its token already burned.
    let Some(account) = db::accounts::lock_by_id(&mut *tx, pending.account_id).await? else {
        // Account deleted out from under the token; indistinguishable from
        // a revoked link on purpose.
        return Err(ResetError::TokenInvalid);
    };

    let Some(reset) = db::reset_tokens::find_valid(&mut *tx, token).await? else {
        return Err(ResetError::TokenInvalid);
    };

    db::accounts::update_password(&mut *tx, account.id, &password_hash).await?;
    db::reset_tokens::mark_used(&mut *tx, reset.id).await?;
    let siblings = db::reset_tokens::invalidate_all_for_account(&mut *tx, account.id).await?;

    tx.commit().await?;

    if siblings > 0 {
        tracing::debug!(
            "Invalidated {siblings} outstanding reset token(s) for account {}",
            account.id
        );
    }

    Ok(account.id)
}
