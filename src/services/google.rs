//! Google sign-in over the OAuth 2.0 authorization code flow.

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::GoogleConfig;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Google rejected the request: HTTP {status}: {body}")]
    Rejected { status: reqwest::StatusCode, body: String },
}

/// Profile returned by the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(http: reqwest::Client, config: GoogleConfig) -> Self { Self { http, config } }

    /// Consent page URL carrying `state`.
    pub fn consent_url(&self, state: &str) -> Result<String, GoogleError> {
        let url = Url::parse_with_params(
            AUTH_ENDPOINT,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchanges an authorization code and fetches the user's profile.
    #[instrument(skip_all, err(Display))]
    pub async fn profile_for_code(&self, code: &str) -> Result<GoogleProfile, GoogleError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let token: TokenResponse = ok_json(response).await?;

        let response = self.http.get(USERINFO_ENDPOINT).bearer_auth(&token.access_token).send().await?;
        ok_json(response).await
    }
}

async fn ok_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    Err(GoogleError::Rejected { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_consent_url_carries_state_and_redirect() {
        let oauth = GoogleOAuth::new(
            reqwest::Client::new(),
            GoogleConfig {
                client_id: "client-123".into(),
                client_secret: SecretString::from("shh".to_string()),
                redirect_url: "https://shop.example/auth/google/callback".into(),
            },
        );
        let url = Url::parse(&oauth.consent_url("xyz").unwrap()).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(pairs.contains(&("client_id".into(), "client-123".into())));
        assert!(pairs.contains(&("redirect_uri".into(), "https://shop.example/auth/google/callback".into())));
    }
}
