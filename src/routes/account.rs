//! Profile, password and email change.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::db;
use crate::domain::aggregates::account::{normalize_email, validate_https_url, validate_person_name};
use crate::domain::aggregates::{OtpPurpose, Profile};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::routes::auth::ensure_passwords_match;
use crate::services::auth::{hash_password, verify_password};
use crate::services::otp;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", get(get_profile).put(update_profile))
        .route("/account/password", post(change_password))
        .route("/account/email", post(request_email_change))
        .route("/account/email/confirm", post(confirm_email_change))
}

async fn get_profile(CurrentUser(user): CurrentUser) -> Json<Profile> { Json(Profile::from(&user)) }

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(custom = "validate_person_name")]
    pub full_name: String,
    #[validate(custom = "validate_https_url")]
    pub avatar_url: Option<String>,
}

async fn update_profile(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<UpdateProfile>) -> Result<Json<Profile>> {
    r.validate()?;
    let avatar = r.avatar_url.as_deref().map(str::trim).filter(|u| !u.is_empty());
    let user = db::users::update_profile(&s.db, user.id, &r.full_name, avatar).await?;
    Ok(Json(Profile::from(&user)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePassword {
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
    pub confirm_password: String,
}

async fn change_password(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<ChangePassword>) -> Result<StatusCode> {
    r.validate()?;
    let current_ok = user.password_hash.as_deref().map_or(false, |hash| verify_password(hash, &r.current_password));
    if !current_ok {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    ensure_passwords_match(&r.new_password, &r.confirm_password)?;
    db::users::set_password(&s.db, user.id, &hash_password(&r.new_password)?).await?;
    info!(user_id = %user.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailChange {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
}

async fn request_email_change(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<EmailChange>) -> Result<StatusCode> {
    r.validate()?;
    let email = normalize_email(&r.email);
    if email == user.email {
        return Err(AppError::BadRequest("This is already your email".into()));
    }
    if db::users::email_taken(&s.db, &email, Some(user.id)).await? {
        return Err(AppError::Conflict("Email is already in use".into()));
    }
    otp::issue(&s.db, s.mailer.as_ref(), s.config.otp_ttl_secs, &user, OtpPurpose::EmailChange, &email, Some(&email)).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct ConfirmEmail {
    pub otp: String,
}

async fn confirm_email_change(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<ConfirmEmail>) -> Result<Json<Profile>> {
    let code = otp::verify(&s.db, &user, OtpPurpose::EmailChange, &r.otp).await?;
    let email = code.new_email.ok_or_else(|| AppError::BadRequest("No email change pending".into()))?;
    if db::users::email_taken(&s.db, &email, Some(user.id)).await? {
        return Err(AppError::Conflict("Email is already in use".into()));
    }
    db::users::set_email(&s.db, user.id, &email).await?;
    info!(user_id = %user.id, "Email changed");
    let user = db::users::find_by_id(&s.db, user.id).await?.ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(Profile::from(&user)))
}
