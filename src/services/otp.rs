//! Issuing and checking one-time codes.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::db;
use crate::domain::aggregates::account::generate_otp;
use crate::domain::aggregates::{OtpCode, OtpError, OtpPurpose, User};
use crate::error::Result;
use crate::services::mailer::{otp_body, Mailer};

/// Mails a fresh code to `to`, replacing any earlier code for the same purpose.
/// `new_email` is carried for email changes.
#[instrument(skip(db, mailer, user), fields(user_id = %user.id), err(Display))]
pub async fn issue(
    db: &PgPool,
    mailer: &dyn Mailer,
    ttl_secs: i64,
    user: &User,
    purpose: OtpPurpose,
    to: &str,
    new_email: Option<&str>,
) -> Result<()> {
    let now = Utc::now();
    if let Some(previous) = db::otps::latest(db, user.id, purpose).await? {
        previous.resend_allowed(now)?;
    }

    let code = generate_otp();
    let mut tx = db.begin().await?;
    db::otps::invalidate(&mut *tx, user.id, purpose).await?;
    db::otps::insert(&mut *tx, user.id, purpose, &code, new_email, now + Duration::seconds(ttl_secs)).await?;
    tx.commit().await?;

    mailer.send(to, purpose.subject(), &otp_body(purpose, &code, ttl_secs)).await?;
    info!(?purpose, "Verification code sent");
    Ok(())
}

/// Checks `submitted` against the user's live code and consumes it on success.
#[instrument(skip(db, user, submitted), fields(user_id = %user.id), err(Display))]
pub async fn verify(db: &PgPool, user: &User, purpose: OtpPurpose, submitted: &str) -> Result<OtpCode> {
    let otp = db::otps::latest(db, user.id, purpose).await?.ok_or(OtpError::NotFound)?;
    match otp.check(submitted, Utc::now()) {
        Ok(()) => {
            if !db::otps::consume(db, otp.id).await? {
                return Err(OtpError::NotFound.into());
            }
            Ok(otp)
        }
        Err(OtpError::Mismatch) => {
            let recorded = db::otps::record_attempt(db, otp.id).await?;
            if let Some(attempts) = recorded {
                warn!(?purpose, attempts, "Wrong verification code");
            }
            Err(OtpError::after_wrong_guess(recorded).into())
        }
        Err(e) => Err(e.into()),
    }
}
