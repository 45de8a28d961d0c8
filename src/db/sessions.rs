//! Bearer sessions and OAuth state tokens.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::User;

pub async fn create(ex: impl PgExecutor<'_>, token: &str, user_id: Uuid, expires_at: DateTime<Utc>) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(ex)
        .await?;
    Ok(())
}

/// The session's user, if the token exists and has not expired.
pub async fn find_user(ex: impl PgExecutor<'_>, token: &str, now: DateTime<Utc>) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        "SELECT u.* FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = $1 AND s.expires_at > $2",
    )
    .bind(token)
    .bind(now)
    .fetch_optional(ex)
    .await
}

pub async fn delete(ex: impl PgExecutor<'_>, token: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = $1").bind(token).execute(ex).await?;
    Ok(())
}

pub async fn delete_for_user(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<u64> {
    Ok(sqlx::query("DELETE FROM sessions WHERE user_id = $1").bind(user_id).execute(ex).await?.rows_affected())
}

pub async fn create_oauth_state(ex: impl PgExecutor<'_>, state: &str, expires_at: DateTime<Utc>) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO oauth_states (state, expires_at) VALUES ($1, $2)").bind(state).bind(expires_at).execute(ex).await?;
    Ok(())
}

/// Consumes a state token. Returns false when unknown or expired.
pub async fn take_oauth_state(ex: impl PgExecutor<'_>, state: &str, now: DateTime<Utc>) -> sqlx::Result<bool> {
    let row: Option<DateTime<Utc>> = sqlx::query_scalar("DELETE FROM oauth_states WHERE state = $1 RETURNING expires_at")
        .bind(state)
        .fetch_optional(ex)
        .await?;
    Ok(row.map_or(false, |expires_at| expires_at > now))
}
