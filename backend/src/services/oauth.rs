//! Minimal Google OAuth 2.0 authorization-code client.

use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{config::Config, error::AppError};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// The slice of the provider's userinfo response the auth flow needs.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct GoogleOAuthClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GoogleOAuthClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_url: config.google_redirect_url.clone(),
        }
    }

    /// Builds the consent-screen URL the browser is redirected to. The state
    /// nonce is echoed back on the callback and checked against a cookie.
    pub fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let mut url = Url::parse(GOOGLE_AUTH_URL)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid authorize URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", "profile email")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    /// Exchanges the authorization code for an access token and fetches the
    /// user's profile. Any upstream rejection or malformed answer surfaces as
    /// `ExternalAuthFailed`.
    pub async fn fetch_profile(&self, code: &str) -> Result<GoogleProfile, AppError> {
        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalAuthFailed(format!("token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalAuthFailed(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalAuthFailed(format!("malformed token response: {}", e)))?;

        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::ExternalAuthFailed(format!("userinfo fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalAuthFailed(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalAuthFailed(format!("malformed userinfo: {}", e)))
    }
}

pub fn generate_state_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
