//! One-time verification codes.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::account::OTP_MAX_ATTEMPTS;
use crate::domain::aggregates::{OtpCode, OtpPurpose};

/// The newest unconsumed code for this purpose.
pub async fn latest(ex: impl PgExecutor<'_>, user_id: Uuid, purpose: OtpPurpose) -> sqlx::Result<Option<OtpCode>> {
    sqlx::query_as::<_, OtpCode>(
        "SELECT * FROM otp_codes WHERE user_id = $1 AND purpose = $2 AND NOT consumed ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(purpose)
    .fetch_optional(ex)
    .await
}

pub async fn invalidate(ex: impl PgExecutor<'_>, user_id: Uuid, purpose: OtpPurpose) -> sqlx::Result<()> {
    sqlx::query("UPDATE otp_codes SET consumed = TRUE WHERE user_id = $1 AND purpose = $2 AND NOT consumed")
        .bind(user_id)
        .bind(purpose)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn insert(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    purpose: OtpPurpose,
    code: &str,
    new_email: Option<&str>,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<OtpCode> {
    sqlx::query_as::<_, OtpCode>(
        "INSERT INTO otp_codes (id, user_id, purpose, code, new_email, expires_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(purpose)
    .bind(code)
    .bind(new_email)
    .bind(expires_at)
    .fetch_one(ex)
    .await
}

/// Counts a wrong guess. `None` once the code has no attempts left.
pub async fn record_attempt(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<i32>> {
    sqlx::query_scalar("UPDATE otp_codes SET attempts = attempts + 1 WHERE id = $1 AND attempts < $2 RETURNING attempts")
        .bind(id)
        .bind(OTP_MAX_ATTEMPTS)
        .fetch_optional(ex)
        .await
}

/// Marks a code used. False when it was already used or exhausted.
pub async fn consume(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<bool> {
    let done = sqlx::query("UPDATE otp_codes SET consumed = TRUE WHERE id = $1 AND NOT consumed AND attempts < $2")
        .bind(id)
        .bind(OTP_MAX_ATTEMPTS)
        .execute(ex)
        .await?;
    Ok(done.rows_affected() == 1)
}
