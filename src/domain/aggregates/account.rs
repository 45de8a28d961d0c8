//! Accounts: users, one-time codes and saved addresses

use std::borrow::Cow;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationError;

use crate::domain::aggregates::order::ShippingAddress;

pub const OTP_LENGTH: usize = 6;
pub const OTP_MAX_ATTEMPTS: i32 = 5;
pub const OTP_RESEND_INTERVAL_SECS: i64 = 30;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub google_sub: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_blocked: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub is_staff: bool,
}

impl From<&User> for Profile {
    fn from(u: &User) -> Self {
        Self { id: u.id, full_name: u.full_name.clone(), email: u.email.clone(), avatar_url: u.avatar_url.clone(), is_staff: u.is_staff }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "otp_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Signup,
    PasswordReset,
    EmailChange,
}

impl OtpPurpose {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Signup => "Verify your GearUp account",
            Self::PasswordReset => "Reset your GearUp password",
            Self::EmailChange => "Confirm your new GearUp email",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub purpose: OtpPurpose,
    pub code: String,
    pub new_email: Option<String>,
    pub attempts: i32,
    pub consumed: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("No active verification code; request a new one")]
    NotFound,
    #[error("Verification code has expired")]
    Expired,
    #[error("Too many attempts; request a new code")]
    TooManyAttempts,
    #[error("Invalid verification code")]
    Mismatch,
    #[error("Please wait {0} seconds before requesting another code")]
    ResendTooSoon(i64),
}

impl OtpError {
    /// Outcome of a wrong guess, given the attempt count the store recorded.
    /// `None` means the store refused the attempt because the cap was hit.
    pub fn after_wrong_guess(recorded: Option<i32>) -> Self {
        match recorded {
            Some(n) if n <= OTP_MAX_ATTEMPTS => Self::Mismatch,
            _ => Self::TooManyAttempts,
        }
    }
}

impl OtpCode {
    /// Checks a submitted code. The caller records a failed attempt on `Mismatch`.
    pub fn check(&self, submitted: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        if self.consumed { return Err(OtpError::NotFound); }
        if now > self.expires_at { return Err(OtpError::Expired); }
        if self.attempts >= OTP_MAX_ATTEMPTS { return Err(OtpError::TooManyAttempts); }
        if !constant_time_eq(self.code.as_bytes(), submitted.trim().as_bytes()) { return Err(OtpError::Mismatch); }
        Ok(())
    }

    pub fn resend_allowed(&self, now: DateTime<Utc>) -> Result<(), OtpError> {
        let ready_at = self.created_at + Duration::seconds(OTP_RESEND_INTERVAL_SECS);
        if now < ready_at {
            return Err(OtpError::ResendTooSoon((ready_at - now).num_seconds().max(1)));
        }
        Ok(())
    }
}

pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Address {
    pub fn snapshot(&self) -> ShippingAddress {
        ShippingAddress {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            address_line_1: self.address_line_1.clone(),
            address_line_2: self.address_line_2.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
    }
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Non-empty and free of digits.
pub fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() { return Err(invalid("required", "Name is required")); }
    if name.chars().any(|c| c.is_ascii_digit()) { return Err(invalid("name", "Name cannot contain numbers")); }
    Ok(())
}

/// Letters, spaces and hyphens only.
pub fn validate_place_name(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-') {
        return Err(invalid("letters", "Only letters, spaces and hyphens are allowed"));
    }
    Ok(())
}

fn exact_digits(value: &str, n: usize) -> bool { value.len() == n && value.chars().all(|c| c.is_ascii_digit()) }

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if exact_digits(value.trim(), 10) { Ok(()) } else { Err(invalid("phone", "Phone number must be exactly 10 digits")) }
}

pub fn validate_postal_code(value: &str) -> Result<(), ValidationError> {
    if exact_digits(value.trim(), 6) { Ok(()) } else { Err(invalid("postal_code", "Postal code must be exactly 6 digits")) }
}

pub fn validate_https_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(u) if u.scheme() == "https" => Ok(()),
        _ => Err(invalid("url", "Avatar must be an https URL")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn otp(code: &str, attempts: i32, age_secs: i64) -> OtpCode {
        let created_at = Utc::now() - Duration::seconds(age_secs);
        OtpCode {
            id: Uuid::now_v7(), user_id: Uuid::now_v7(), purpose: OtpPurpose::Signup, code: code.into(), new_email: None,
            attempts, consumed: false, expires_at: created_at + Duration::seconds(300), created_at,
        }
    }

    #[test]
    fn test_otp_check() {
        let now = Utc::now();
        assert!(otp("123456", 0, 10).check(" 123456 ", now).is_ok());
        assert_eq!(otp("123456", 0, 10).check("654321", now), Err(OtpError::Mismatch));
        assert_eq!(otp("123456", 5, 10).check("123456", now), Err(OtpError::TooManyAttempts));
        assert_eq!(otp("123456", 0, 301).check("123456", now), Err(OtpError::Expired));
    }

    #[test]
    fn test_wrong_guess_past_the_cap() {
        assert_eq!(OtpError::after_wrong_guess(Some(1)), OtpError::Mismatch);
        assert_eq!(OtpError::after_wrong_guess(Some(OTP_MAX_ATTEMPTS)), OtpError::Mismatch);
        assert_eq!(OtpError::after_wrong_guess(None), OtpError::TooManyAttempts);
    }

    #[test]
    fn test_otp_resend_throttle() {
        let now = Utc::now();
        assert!(matches!(otp("1", 0, 5).resend_allowed(now), Err(OtpError::ResendTooSoon(_))));
        assert!(otp("1", 0, 31).resend_allowed(now).is_ok());
    }

    #[test]
    fn test_generate_otp() {
        let code = generate_otp();
        assert_eq!(code.len(), OTP_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_field_validators() {
        assert!(validate_person_name("Asha Rao").is_ok());
        assert!(validate_person_name("R2D2").is_err());
        assert!(validate_person_name("  ").is_err());
        assert!(validate_place_name("Navi-Mumbai").is_ok());
        assert!(validate_place_name("Sector 5").is_err());
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("98765").is_err());
        assert!(validate_postal_code("560001").is_ok());
        assert!(validate_postal_code("56000A").is_err());
        assert!(validate_https_url("https://cdn.example.com/a.png").is_ok());
        assert!(validate_https_url("http://cdn.example.com/a.png").is_err());
    }
}
