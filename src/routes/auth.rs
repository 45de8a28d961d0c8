//! Signup, login, OTP verification, password reset and Google sign-in.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::db;
use crate::db::users::NewUser;
use crate::domain::aggregates::account::{normalize_email, validate_person_name};
use crate::domain::aggregates::{OtpPurpose, Profile, User};
use crate::error::{AppError, Result};
use crate::middleware::SessionToken;
use crate::services::auth::{hash_password, new_session_token, verify_password};
use crate::services::otp;
use crate::state::AppState;

const OAUTH_STATE_TTL_MINUTES: i64 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/verify", post(verify_signup))
        .route("/auth/resend", post(resend_signup_otp))
        .route("/auth/login", post(login))
        .route("/auth/admin/login", post(admin_login))
        .route("/auth/logout", post(logout))
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/reset", post(reset_password))
        .route("/auth/google", get(google_start))
        .route("/auth/google/callback", get(google_callback))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Profile,
}

async fn start_session(state: &AppState, user: &User) -> Result<SessionResponse> {
    let token = new_session_token();
    let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours);
    db::sessions::create(&state.db, &token, user.id, expires_at).await?;
    Ok(SessionResponse { token, expires_at, user: Profile::from(user) })
}

fn ensure_can_sign_in(user: &User) -> Result<()> {
    if user.is_blocked {
        return Err(AppError::Forbidden("Your account has been blocked".into()));
    }
    if !user.is_active {
        return Err(AppError::Forbidden("Please verify your email".into()));
    }
    Ok(())
}

pub(crate) fn ensure_passwords_match(password: &str, confirm: &str) -> Result<()> {
    if password != confirm {
        return Err(AppError::BadRequest("Passwords do not match".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(custom = "validate_person_name")]
    pub full_name: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub confirm_password: String,
}

#[instrument(skip_all, fields(email = %r.email), err(Display))]
async fn signup(State(s): State<AppState>, Json(r): Json<SignupRequest>) -> Result<(StatusCode, Json<serde_json::Value>)> {
    r.validate()?;
    ensure_passwords_match(&r.password, &r.confirm_password)?;
    let email = normalize_email(&r.email);
    if db::users::email_taken(&s.db, &email, None).await? {
        return Err(AppError::Conflict("An account with this email already exists".into()));
    }
    let hash = hash_password(&r.password)?;
    let user = db::users::create(
        &s.db,
        NewUser { email: &email, full_name: &r.full_name, password_hash: Some(&hash), google_sub: None, is_active: false },
    )
    .await?;
    otp::issue(&s.db, s.mailer.as_ref(), s.config.otp_ttl_secs, &user, OtpPurpose::Signup, &user.email, None).await?;
    info!(user_id = %user.id, "Account created");
    Ok((StatusCode::CREATED, Json(json!({ "message": "Verification code sent", "email": user.email }))))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub otp: String,
}

async fn verify_signup(State(s): State<AppState>, Json(r): Json<VerifyRequest>) -> Result<Json<SessionResponse>> {
    let user = db::users::find_by_email(&s.db, &normalize_email(&r.email)).await?.ok_or_else(|| AppError::not_found("Account"))?;
    if user.is_active {
        return Err(AppError::Conflict("Account is already verified".into()));
    }
    otp::verify(&s.db, &user, OtpPurpose::Signup, &r.otp).await?;
    db::users::activate(&s.db, user.id).await?;
    let user = User { is_active: true, ..user };
    ensure_can_sign_in(&user)?;
    Ok(Json(start_session(&s, &user).await?))
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

async fn resend_signup_otp(State(s): State<AppState>, Json(r): Json<EmailRequest>) -> Result<StatusCode> {
    let user = db::users::find_by_email(&s.db, &normalize_email(&r.email))
        .await?
        .filter(|u| !u.is_active)
        .ok_or_else(|| AppError::not_found("Unverified account"))?;
    otp::issue(&s.db, s.mailer.as_ref(), s.config.otp_ttl_secs, &user, OtpPurpose::Signup, &user.email, None).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn authenticate(s: &AppState, r: &LoginRequest) -> Result<User> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());
    let user = db::users::find_by_email(&s.db, &normalize_email(&r.email)).await?.ok_or_else(invalid)?;
    let ok = user.password_hash.as_deref().map_or(false, |hash| verify_password(hash, &r.password));
    if !ok {
        return Err(invalid());
    }
    ensure_can_sign_in(&user)?;
    Ok(user)
}

async fn login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> Result<Json<SessionResponse>> {
    let user = authenticate(&s, &r).await?;
    Ok(Json(start_session(&s, &user).await?))
}

async fn admin_login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> Result<Json<SessionResponse>> {
    let user = authenticate(&s, &r).await?;
    if !user.is_staff {
        return Err(AppError::Forbidden("Admin access required".into()));
    }
    info!(user_id = %user.id, "Staff login");
    Ok(Json(start_session(&s, &user).await?))
}

async fn logout(State(s): State<AppState>, SessionToken(token): SessionToken) -> Result<StatusCode> {
    db::sessions::delete(&s.db, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Always accepted, so the response does not reveal which emails exist.
/// Throttling and delivery failures are only logged.
async fn forgot_password(State(s): State<AppState>, Json(r): Json<EmailRequest>) -> StatusCode {
    if let Err(e) = send_reset_code(&s, &r.email).await {
        warn!(error = %e, "Password reset code not sent");
    }
    StatusCode::ACCEPTED
}

async fn send_reset_code(s: &AppState, email: &str) -> Result<()> {
    if let Some(user) = db::users::find_by_email(&s.db, &normalize_email(email)).await? {
        otp::issue(&s.db, s.mailer.as_ref(), s.config.otp_ttl_secs, &user, OtpPurpose::PasswordReset, &user.email, None).await?;
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub confirm_password: String,
}

async fn reset_password(State(s): State<AppState>, Json(r): Json<ResetPasswordRequest>) -> Result<StatusCode> {
    r.validate()?;
    ensure_passwords_match(&r.password, &r.confirm_password)?;
    let user = db::users::find_by_email(&s.db, &normalize_email(&r.email)).await?.ok_or_else(|| AppError::not_found("Account"))?;
    otp::verify(&s.db, &user, OtpPurpose::PasswordReset, &r.otp).await?;
    db::users::set_password(&s.db, user.id, &hash_password(&r.password)?).await?;
    db::sessions::delete_for_user(&s.db, user.id).await?;
    info!(user_id = %user.id, "Password reset");
    Ok(StatusCode::NO_CONTENT)
}

fn google(s: &AppState) -> Result<&crate::services::google::GoogleOAuth> {
    s.google.as_ref().ok_or_else(|| AppError::NotFound("Google sign-in is not enabled".into()))
}

async fn google_start(State(s): State<AppState>) -> Result<Json<serde_json::Value>> {
    let oauth = google(&s)?;
    let state = new_session_token();
    db::sessions::create_oauth_state(&s.db, &state, Utc::now() + Duration::minutes(OAUTH_STATE_TTL_MINUTES)).await?;
    Ok(Json(json!({ "url": oauth.consent_url(&state)? })))
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[instrument(skip_all, err(Display))]
async fn google_callback(State(s): State<AppState>, Query(q): Query<GoogleCallback>) -> Result<Json<SessionResponse>> {
    let oauth = google(&s)?;
    if let Some(error) = q.error {
        return Err(AppError::BadRequest(format!("Google sign-in was cancelled: {error}")));
    }
    let (Some(code), Some(state)) = (q.code, q.state) else {
        return Err(AppError::BadRequest("Missing code or state".into()));
    };
    if !db::sessions::take_oauth_state(&s.db, &state, Utc::now()).await? {
        return Err(AppError::BadRequest("Sign-in link expired, please try again".into()));
    }

    let profile = oauth.profile_for_code(&code).await?;
    let user = match db::users::find_by_google_sub(&s.db, &profile.sub).await? {
        Some(user) => user,
        None => {
            let email = normalize_email(&profile.email);
            let existing = if profile.email_verified { db::users::find_by_email(&s.db, &email).await? } else { None };
            match existing {
                Some(user) => db::users::link_google(&s.db, user.id, &profile.sub).await?,
                None => {
                    let name = profile.name.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or_else(|| email.split('@').next().unwrap_or("GearUp user"));
                    db::users::create(
                        &s.db,
                        NewUser { email: &email, full_name: name, password_hash: None, google_sub: Some(&profile.sub), is_active: true },
                    )
                    .await?
                }
            }
        }
    };
    ensure_can_sign_in(&user)?;
    info!(user_id = %user.id, "Google sign-in");
    Ok(Json(start_session(&s, &user).await?))
}
