//! Saved addresses. At most one per user is the default.

use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::domain::aggregates::Address;

#[derive(Debug, Clone, serde::Deserialize, validator::Validate)]
pub struct AddressInput {
    #[validate(custom = "crate::domain::aggregates::account::validate_place_name")]
    pub full_name: String,
    #[validate(custom = "crate::domain::aggregates::account::validate_phone")]
    pub phone: String,
    #[validate(length(min = 1, message = "Address line 1 is required"))]
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    #[validate(custom = "crate::domain::aggregates::account::validate_place_name")]
    pub city: String,
    #[validate(custom = "crate::domain::aggregates::account::validate_place_name")]
    pub state: String,
    #[validate(custom = "crate::domain::aggregates::account::validate_postal_code")]
    pub postal_code: String,
    #[validate(custom = "crate::domain::aggregates::account::validate_place_name")]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn list(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Vec<Address>> {
    sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC")
        .bind(user_id)
        .fetch_all(ex)
        .await
}

pub async fn find(ex: impl PgExecutor<'_>, user_id: Uuid, id: Uuid) -> sqlx::Result<Option<Address>> {
    sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

pub async fn insert(conn: &mut PgConnection, user_id: Uuid, input: &AddressInput) -> sqlx::Result<Address> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    let make_default = input.is_default || existing == 0;
    if make_default {
        clear_default(&mut *conn, user_id).await?;
    }
    sqlx::query_as::<_, Address>(
        "INSERT INTO addresses (id, user_id, full_name, phone, address_line_1, address_line_2, city, state, postal_code, country, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(input.full_name.trim())
    .bind(input.phone.trim())
    .bind(input.address_line_1.trim())
    .bind(input.address_line_2.as_deref().map(str::trim).filter(|s| !s.is_empty()))
    .bind(input.city.trim())
    .bind(input.state.trim())
    .bind(input.postal_code.trim())
    .bind(input.country.trim())
    .bind(make_default)
    .fetch_one(&mut *conn)
    .await
}

pub async fn update(conn: &mut PgConnection, user_id: Uuid, id: Uuid, input: &AddressInput) -> sqlx::Result<Option<Address>> {
    if input.is_default {
        clear_default(&mut *conn, user_id).await?;
    }
    sqlx::query_as::<_, Address>(
        "UPDATE addresses SET full_name = $3, phone = $4, address_line_1 = $5, address_line_2 = $6, city = $7, state = $8, \
         postal_code = $9, country = $10, is_default = is_default OR $11 WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .bind(input.full_name.trim())
    .bind(input.phone.trim())
    .bind(input.address_line_1.trim())
    .bind(input.address_line_2.as_deref().map(str::trim).filter(|s| !s.is_empty()))
    .bind(input.city.trim())
    .bind(input.state.trim())
    .bind(input.postal_code.trim())
    .bind(input.country.trim())
    .bind(input.is_default)
    .fetch_optional(&mut *conn)
    .await
}

async fn clear_default(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default").bind(user_id).execute(ex).await?;
    Ok(())
}

pub async fn set_default(conn: &mut PgConnection, user_id: Uuid, id: Uuid) -> sqlx::Result<bool> {
    clear_default(&mut *conn, user_id).await?;
    let done = sqlx::query("UPDATE addresses SET is_default = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(done.rows_affected() == 1)
}

/// Deleting the default promotes the most recent remaining address.
pub async fn delete(conn: &mut PgConnection, user_id: Uuid, id: Uuid) -> sqlx::Result<bool> {
    let was_default: Option<bool> = sqlx::query_scalar("DELETE FROM addresses WHERE id = $1 AND user_id = $2 RETURNING is_default")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    match was_default {
        None => Ok(false),
        Some(false) => Ok(true),
        Some(true) => {
            sqlx::query(
                "UPDATE addresses SET is_default = TRUE WHERE id = \
                 (SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1)",
            )
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
            Ok(true)
        }
    }
}
