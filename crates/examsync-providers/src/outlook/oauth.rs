//! Token refresh against the Microsoft identity platform.
//!
//! Only the `refresh_token` grant is implemented here. The authorization-code
//! flow that produces the first credential happens outside this crate.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

use super::config::{AppCredentials, OutlookConfig};
use crate::credentials::{TokenRefresher, TokenResponse};

/// OAuth client for the v2.0 token endpoint.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: AppCredentials,
    token_url: String,
    scopes: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client for the tenant, credentials and scopes in `config`.
    pub fn new(config: &OutlookConfig) -> ProviderResult<Self> {
        Self::with_token_url(config, config.token_url(), config.timeout)
    }

    /// Creates a client posting to an explicit token endpoint.
    pub fn with_token_url(
        config: &OutlookConfig,
        token_url: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            token_url: token_url.into(),
            scopes: config.scopes.join(" "),
            http_client,
        })
    }

    /// Form parameters of a refresh request.
    fn refresh_params<'a>(&'a self, refresh_token: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", self.scopes.as_str()),
        ];
        if let Some(secret) = self.credentials.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }
        params
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<TokenResponse> {
        debug!(url = %self.token_url, "refreshing access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&self.refresh_params(refresh_token))
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::from_response(
                status.as_u16(),
                body,
                "token refresh failed",
            ));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))?;

        info!("successfully refreshed access token");
        Ok(token_response)
    }
}

impl TokenRefresher for OAuthClient {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<TokenResponse>> {
        Box::pin(self.refresh_token(refresh_token))
    }
}
