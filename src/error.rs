//! Unified error handling.
//!
//! Route handlers return `Result<T, AppError>`. Domain errors convert into the
//! matching HTTP status; database and internal failures are logged and
//! answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::{
    CartError, CouponError, OfferError, OrderError, OtpError, ProductError, WalletError,
};
use crate::services::google::GoogleError;
use crate::services::mailer::MailError;
use crate::services::razorpay::RazorpayError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("{}", first_message(.0))]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Payment gateway, OAuth provider or mail relay failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn not_found(what: &str) -> Self { Self::NotFound(format!("{what} not found")) }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Request error");
                "Internal server error".to_string()
            }
            Self::Upstream(_) => {
                tracing::warn!(error = %self, "Upstream failure");
                "External service error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// First field message in a stable (sorted) order.
fn first_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("Invalid {field}"),
            })
        })
        .unwrap_or_else(|| "Invalid input".to_string())
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("Not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict("Record already exists".to_string()),
            _ => Self::Database(err),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::MaxQuantity => Self::Conflict(err.to_string()),
            CartError::OutOfStock | CartError::Unavailable | CartError::Empty => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<CouponError> for AppError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::NotFound => Self::NotFound(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::ItemNotFound => Self::NotFound(err.to_string()),
            OrderError::ReasonRequired => Self::BadRequest(err.to_string()),
            _ => Self::Conflict(err.to_string()),
        }
    }
}

impl From<WalletError> for AppError {
    fn from(err: WalletError) -> Self { Self::BadRequest(err.to_string()) }
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self { Self::BadRequest(err.to_string()) }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self { Self::BadRequest(err.to_string()) }
}

impl From<OfferError> for AppError {
    fn from(err: OfferError) -> Self { Self::BadRequest(err.to_string()) }
}

impl From<RazorpayError> for AppError {
    fn from(err: RazorpayError) -> Self { Self::Upstream(format!("Razorpay: {err}")) }
}

impl From<GoogleError> for AppError {
    fn from(err: GoogleError) -> Self { Self::Upstream(format!("Google: {err}")) }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self { Self::Upstream(format!("Mail: {err}")) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email(message = "Enter a valid email address"))]
        email: String,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::from(CartError::MaxQuantity).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::from(CouponError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(CouponError::AlreadyUsed).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::from(OrderError::NotCancellable).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::from(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Upstream("razorpay".into()).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_message_is_exposed() {
        let err = Signup { email: "nope".into() }.validate().unwrap_err();
        assert_eq!(AppError::from(err).to_string(), "Enter a valid email address");
    }
}
