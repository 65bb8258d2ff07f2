use sqlx::PgPool;
use uuid::Uuid;

/// Record an audit event after a mutation. Best-effort: a failed insert is
/// logged and must never turn a completed reset into an error response.
pub async fn log_event(pool: &PgPool, account_id: Uuid, action: &str) {
    if let Err(e) = crate::db::audit::log_event(pool, account_id, action).await {
        tracing::error!("Failed to log audit event {action}: {e}");
    }
}
