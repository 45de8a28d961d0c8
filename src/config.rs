//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `HOST` / `PORT` - bind address (default: 0.0.0.0:8083)
//! - `DB_MAX_CONNECTIONS` - pool size (default: 10)
//! - `TAX_RATE` - fraction applied to each line (default: 0.18)
//! - `DELIVERY_CHARGE` - flat charge per order (default: 50)
//! - `SESSION_TTL_HOURS` (default: 72), `OTP_TTL_SECS` (default: 300)
//! - `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET`, `RAZORPAY_API_BASE`
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URL`
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `MAIL_FROM`
//! - `NATS_URL`

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use crate::domain::pricing::PricingPolicy;
use crate::domain::value_objects::Money;

pub const DEFAULT_RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub db_max_connections: u32,
    pub tax_rate: Decimal,
    pub delivery_charge: Money,
    pub session_ttl_hours: i64,
    pub otp_ttl_secs: i64,
    /// Online payment is disabled when absent.
    pub razorpay: Option<RazorpayConfig>,
    /// Google sign-in is disabled when absent.
    pub google: Option<GoogleConfig>,
    /// The log mailer is used when absent.
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub nats_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: SecretString,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let tax_rate: Decimal = get_parsed("TAX_RATE", "0.18")?;
        if tax_rate < Decimal::ZERO || tax_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar("TAX_RATE".into(), "must be in [0, 1)".into()));
        }
        let delivery_charge: Decimal = get_parsed("DELIVERY_CHARGE", "50")?;
        if delivery_charge < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar("DELIVERY_CHARGE".into(), "must not be negative".into()));
        }

        Ok(Self {
            database_url,
            host: get_parsed("HOST", "0.0.0.0")?,
            port: get_parsed("PORT", "8083")?,
            db_max_connections: get_parsed("DB_MAX_CONNECTIONS", "10")?,
            tax_rate,
            delivery_charge: Money::new(delivery_charge),
            session_ttl_hours: get_parsed("SESSION_TTL_HOURS", "72")?,
            otp_ttl_secs: get_parsed("OTP_TTL_SECS", "300")?,
            razorpay: RazorpayConfig::from_env(),
            google: GoogleConfig::from_env(),
            smtp: SmtpConfig::from_env()?,
            mail_from: get_env_or_default("MAIL_FROM", "GearUp <no-reply@gearup.local>"),
            nats_url: get_optional_env("NATS_URL"),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }

    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy { tax_rate: self.tax_rate, delivery_charge: self.delivery_charge }
    }
}

impl RazorpayConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            key_id: get_optional_env("RAZORPAY_KEY_ID")?,
            key_secret: SecretString::from(get_optional_env("RAZORPAY_KEY_SECRET")?),
            api_base: get_env_or_default("RAZORPAY_API_BASE", DEFAULT_RAZORPAY_API_BASE),
        })
    }
}

impl GoogleConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            client_id: get_optional_env("GOOGLE_CLIENT_ID")?,
            client_secret: SecretString::from(get_optional_env("GOOGLE_CLIENT_SECRET")?),
            redirect_url: get_optional_env("GOOGLE_REDIRECT_URL")?,
        })
    }
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("SMTP_HOST") else { return Ok(None) };
        Ok(Some(Self {
            host,
            port: get_parsed("SMTP_PORT", "587")?,
            username: get_optional_env("SMTP_USERNAME"),
            password: get_optional_env("SMTP_PASSWORD").map(SecretString::from),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Unset and blank values are treated alike.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn get_parsed<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_when_unset() {
        let port: u16 = get_parsed("GEARUP_TEST_UNSET_PORT", "8083").unwrap();
        assert_eq!(port, 8083);
        let rate: Decimal = get_parsed("GEARUP_TEST_UNSET_RATE", "0.18").unwrap();
        assert_eq!(rate, Decimal::new(18, 2));
    }

    #[test]
    fn test_invalid_value_names_the_variable() {
        let err = get_parsed::<u16>("GEARUP_TEST_UNSET_BAD", "not-a-port").unwrap_err();
        assert!(err.to_string().contains("GEARUP_TEST_UNSET_BAD"));
    }
}
