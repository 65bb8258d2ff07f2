use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::audit;
use crate::error::AppError;
use crate::reset::{self, IssueOutcome, ResetError};
use crate::state::SharedState;

// Absent JSON fields land as empty strings so missing input is reported as
// a 400 validation failure, not a deserializer rejection.
#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct VerifyTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "newPassword")]
    pub new_password: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.reset_limiter.check(&req.email).is_err() {
        return Err(AppError::RateLimited(
            "Too many reset requests. Please try again later.".to_string(),
        ));
    }

    // One body for every non-error outcome: known email, unknown email, and
    // stored-but-undelivered all look identical from outside.
    let response = Json(SuccessResponse {
        success: true,
        message: "If that email is registered, you will receive a link to reset your password."
            .to_string(),
    });

    match reset::issue(
        &state.pool,
        state.mailer.as_deref(),
        &state.config.base_url,
        &req.email,
    )
    .await
    {
        Ok(IssueOutcome::Sent { account_id }) => {
            audit::log_event(&state.pool, account_id, "password_reset.requested").await;
            Ok(response)
        }
        Ok(IssueOutcome::UnknownEmail) => Ok(response),
        Err(ResetError::Delivery(e)) => {
            // The token is stored and redeemable; the failure stays in the
            // logs while the caller sees the usual neutral answer.
            tracing::error!("Failed to send password reset email: {e}");
            Ok(response)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn verify_reset_token(
    State(state): State<SharedState>,
    Json(req): Json<VerifyTokenRequest>,
) -> (StatusCode, Json<VerifyResponse>) {
    match reset::verify(&state.pool, &req.token).await {
        Ok(true) => (
            StatusCode::OK,
            Json(VerifyResponse {
                valid: true,
                error: None,
            }),
        ),
        Ok(false) => (
            StatusCode::OK,
            Json(VerifyResponse {
                valid: false,
                error: Some("Invalid or expired token".to_string()),
            }),
        ),
        Err(ResetError::Validation(msg)) => (
            StatusCode::BAD_REQUEST,
            Json(VerifyResponse {
                valid: false,
                error: Some(msg),
            }),
        ),
        Err(e) => {
            tracing::error!("Token verification failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VerifyResponse {
                    valid: false,
                    error: Some("Unable to verify token".to_string()),
                }),
            )
        }
    }
}

pub async fn reset_password(
    State(state): State<SharedState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let account_id = reset::consume(&state.pool, &req.token, &req.new_password).await?;

    audit::log_event(&state.pool, account_id, "password_reset.completed").await;

    Ok(Json(SuccessResponse {
        success: true,
        message: "Password updated successfully.".to_string(),
    }))
}
