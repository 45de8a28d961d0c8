//! Razorpay orders API and payment signature checks.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;

use crate::config::RazorpayConfig;
use crate::domain::value_objects::{Money, CURRENCY};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum RazorpayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Razorpay rejected the request: HTTP {status}: {body}")]
    Rejected { status: reqwest::StatusCode, body: String },
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    config: RazorpayConfig,
}

impl RazorpayClient {
    pub fn new(http: reqwest::Client, config: RazorpayConfig) -> Self { Self { http, config } }

    pub fn key_id(&self) -> &str { &self.config.key_id }

    /// Creates a gateway order for `amount`, captured automatically on payment.
    #[instrument(skip(self), fields(amount = %amount), err(Display))]
    pub async fn create_order(&self, amount: Money, receipt: &str) -> Result<GatewayOrder, RazorpayError> {
        let response = self
            .http
            .post(format!("{}/v1/orders", self.config.api_base.trim_end_matches('/')))
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .json(&CreateOrderRequest { amount: amount.to_paise(), currency: CURRENCY, receipt, payment_capture: 1 })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        Err(RazorpayError::Rejected { status, body })
    }

    pub fn verify(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(&self.config.key_secret, gateway_order_id, payment_id, signature)
    }
}

/// Checks the checkout signature: hex HMAC-SHA256 of `"{order_id}|{payment_id}"`.
/// The comparison runs in constant time.
pub fn verify_signature(secret: &SecretString, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Hex signature Razorpay would send for this pair.
pub fn sign(secret: &SecretString, gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString { SecretString::from("rzp_test_secret".to_string()) }

    #[test]
    fn test_signature_round_trip() {
        let sig = sign(&secret(), "order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f");
        assert_eq!(sig.len(), 64);
        assert!(verify_signature(&secret(), "order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f", &sig));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let sig = sign(&secret(), "order_A", "pay_B");
        assert!(!verify_signature(&secret(), "order_A", "pay_C", &sig));
        assert!(!verify_signature(&SecretString::from("other".to_string()), "order_A", "pay_B", &sig));
        assert!(!verify_signature(&secret(), "order_A", "pay_B", "not-hex"));
    }
}
