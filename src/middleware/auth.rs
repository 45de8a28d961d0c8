//! Authentication extractors.
//!
//! Requests carry `Authorization: Bearer <session token>`. Handlers take
//! `CurrentUser` for customer routes and `StaffUser` for the admin surface.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;

use crate::db;
use crate::domain::aggregates::User;
use crate::error::AppError;
use crate::services::auth::bearer_token;
use crate::state::AppState;

/// A signed-in, active, unblocked user.
pub struct CurrentUser(pub User);

/// A signed-in staff member.
pub struct StaffUser(pub User);

/// Bearer token from the request, if any.
pub struct SessionToken(pub String);

fn token_from(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string)
}

#[async_trait]
impl FromRequestParts<AppState> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        token_from(parts)
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state).await?;
        let user = db::sessions::find_user(&state.db, &token, Utc::now())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session expired, please log in again".into()))?;
        if user.is_blocked {
            return Err(AppError::Forbidden("Your account has been blocked".into()));
        }
        if !user.is_active {
            return Err(AppError::Forbidden("Please verify your email".into()));
        }
        Ok(Self(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        Ok(Self(user))
    }
}

/// Like `CurrentUser`, but anonymous requests pass through as `None`.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if token_from(parts).is_none() {
            return Ok(Self(None));
        }
        CurrentUser::from_request_parts(parts, state).await.map(|CurrentUser(u)| Self(Some(u)))
    }
}
