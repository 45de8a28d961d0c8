//! Users.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::User;

pub async fn find_by_id(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(ex).await
}

pub async fn find_by_email(ex: impl PgExecutor<'_>, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = LOWER($1)").bind(email).fetch_optional(ex).await
}

pub async fn find_by_google_sub(ex: impl PgExecutor<'_>, sub: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_sub = $1").bind(sub).fetch_optional(ex).await
}

pub async fn email_taken(ex: impl PgExecutor<'_>, email: &str, except: Option<Uuid>) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))")
        .bind(email)
        .bind(except)
        .fetch_one(ex)
        .await
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: Option<&'a str>,
    pub google_sub: Option<&'a str>,
    pub is_active: bool,
}

pub async fn create(ex: impl PgExecutor<'_>, u: NewUser<'_>) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, full_name, password_hash, google_sub, is_active) \
         VALUES ($1, LOWER($2), $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(u.email)
    .bind(u.full_name.trim())
    .bind(u.password_hash)
    .bind(u.google_sub)
    .bind(u.is_active)
    .fetch_one(ex)
    .await
}

pub async fn activate(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET is_active = TRUE, updated_at = NOW() WHERE id = $1").bind(id).execute(ex).await?;
    Ok(())
}

pub async fn set_password(ex: impl PgExecutor<'_>, id: Uuid, hash: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1").bind(id).bind(hash).execute(ex).await?;
    Ok(())
}

pub async fn update_profile(ex: impl PgExecutor<'_>, id: Uuid, full_name: &str, avatar_url: Option<&str>) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>("UPDATE users SET full_name = $2, avatar_url = $3, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(full_name.trim())
        .bind(avatar_url)
        .fetch_one(ex)
        .await
}

pub async fn set_email(ex: impl PgExecutor<'_>, id: Uuid, email: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET email = LOWER($2), updated_at = NOW() WHERE id = $1").bind(id).bind(email).execute(ex).await?;
    Ok(())
}

/// Links a Google account; a verified Google email also activates the user.
pub async fn link_google(ex: impl PgExecutor<'_>, id: Uuid, sub: &str) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>("UPDATE users SET google_sub = $2, is_active = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(sub)
        .fetch_one(ex)
        .await
}

pub async fn set_blocked(ex: impl PgExecutor<'_>, id: Uuid, blocked: bool) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("UPDATE users SET is_blocked = $2, updated_at = NOW() WHERE id = $1 AND NOT is_staff RETURNING *")
        .bind(id)
        .bind(blocked)
        .fetch_optional(ex)
        .await
}

const SEARCH_FILTER: &str = "NOT is_staff AND ($1::text IS NULL OR full_name ILIKE '%' || $1 || '%' OR email ILIKE '%' || $1 || '%')";

pub async fn list_customers(ex: impl PgExecutor<'_>, search: Option<&str>, limit: i64, offset: i64) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT * FROM users WHERE {SEARCH_FILTER} ORDER BY created_at DESC LIMIT $2 OFFSET $3"))
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(ex)
        .await
}

pub async fn count_customers(ex: impl PgExecutor<'_>, search: Option<&str>) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {SEARCH_FILTER}")).bind(search).fetch_one(ex).await
}
