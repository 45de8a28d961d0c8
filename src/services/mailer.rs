//! Outgoing mail: SMTP via lettre, or a tracing-only fallback.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use crate::config::SmtpConfig;
use crate::domain::aggregates::OtpPurpose;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from_address: &str) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.expose_secret().to_string()));
        }
        Ok(Self { transport: builder.build(), from_address: from_address.to_string() })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from_address.parse().map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?)
            .to(to.parse().map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;
        self.transport.send(email).await?;
        info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

/// Logs mail instead of sending it. Used when no SMTP host is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        info!(to = %to, subject = %subject, body = %body, "Email (not sent, no SMTP configured)");
        Ok(())
    }
}

pub fn otp_body(purpose: OtpPurpose, code: &str, ttl_secs: i64) -> String {
    let minutes = (ttl_secs / 60).max(1);
    let action = match purpose {
        OtpPurpose::Signup => "verify your account",
        OtpPurpose::PasswordReset => "reset your password",
        OtpPurpose::EmailChange => "confirm your new email address",
    };
    format!("Your GearUp verification code is {code}.\n\nUse it to {action}. It expires in {minutes} minutes.\n")
}

pub fn order_confirmation_body(name: &str, order_code: &str, amount: &str) -> String {
    format!("Hi {name},\n\nWe received your payment of {amount} for order {order_code}. Thank you for shopping with GearUp.\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_body_mentions_code_and_expiry() {
        let body = otp_body(OtpPurpose::PasswordReset, "482913", 300);
        assert!(body.contains("482913"));
        assert!(body.contains("reset your password"));
        assert!(body.contains("5 minutes"));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_mail() {
        assert!(LogMailer.send("a@b.in", "Hello", "body").await.is_ok());
    }
}
