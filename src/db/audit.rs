use sqlx::PgPool;
use uuid::Uuid;

pub async fn log_event(
    pool: &PgPool,
    account_id: Uuid,
    action: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO audit_events (account_id, action) VALUES ($1, $2)")
        .bind(account_id)
        .bind(action)
        .execute(pool)
        .await?;
    Ok(())
}
