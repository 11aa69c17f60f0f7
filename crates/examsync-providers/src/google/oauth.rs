//! Token refresh against Google's OAuth 2.0 endpoint.

use std::time::Duration;

use tracing::{debug, info};

use crate::credentials::{TokenRefresher, TokenResponse};
use crate::error::{ProviderError, ProviderResult};
use crate::http::{self, read_body, send_error};
use crate::provider::BoxFuture;

use super::config::{GoogleConfig, OAuthCredentials};

/// Google OAuth token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refreshes Google access tokens.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        Self::with_token_url(config, GOOGLE_TOKEN_URL, config.timeout)
    }

    /// Creates a client posting to an explicit token endpoint.
    pub fn with_token_url(
        config: &GoogleConfig,
        token_url: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            credentials: config.credentials.clone(),
            token_url: token_url.into(),
            http_client: http::client(timeout)?,
        })
    }

    fn refresh_params<'a>(&'a self, refresh_token: &'a str) -> [(&'static str, &'a str); 4] {
        [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ]
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Google usually omits `refresh_token` from the answer; the caller keeps
    /// the previous one in that case.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<TokenResponse> {
        debug!(url = %self.token_url, "refreshing Google access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&self.refresh_params(refresh_token))
            .send()
            .await
            .map_err(send_error)?;
        let body = read_body(response, "token refresh failed", |s| s.is_success()).await?;

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))?;

        info!("successfully refreshed Google access token");
        Ok(token_response)
    }
}

impl TokenRefresher for OAuthClient {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<TokenResponse>> {
        Box::pin(self.refresh_token(refresh_token))
    }
}
