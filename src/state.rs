use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::email::SharedMailer;
use crate::rate_limit::ResetRateLimiter;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// Absent when SMTP is unconfigured; issuance then logs the token
    /// instead of mailing it.
    pub mailer: Option<SharedMailer>,
    pub reset_limiter: ResetRateLimiter,
}
