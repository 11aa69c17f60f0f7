//! Outlook calendar configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::credentials::TokenPolicy;

/// Application registration used to refresh tokens.
///
/// Public clients (desktop/mobile registrations) have no secret.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    /// The application (client) ID from the Azure portal.
    pub client_id: String,
    /// The client secret, for confidential client registrations.
    pub client_secret: Option<String>,
}

impl AppCredentials {
    /// Creates credentials for a public client.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
        }
    }

    /// Sets the client secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Checks that the client id is present.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.trim().is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err("client_secret must not be empty when set");
        }
        Ok(())
    }
}

/// Configuration for the Outlook (Microsoft Graph) calendar client.
#[derive(Debug, Clone)]
pub struct OutlookConfig {
    /// Application registration.
    pub credentials: AppCredentials,

    /// Directory tenant used for token refresh (`common`, `organizations`,
    /// `consumers` or a tenant id).
    pub tenant: String,

    /// Target calendar id. When unset, the calendar is resolved by name.
    pub calendar_id: Option<String>,

    /// Name of the calendar to use (and create) when no id is configured.
    pub calendar_name: String,

    /// Path of the credential file.
    ///
    /// Defaults to `<data dir>/examsync/token.json`.
    pub token_path: PathBuf,

    /// When a stored access token is considered usable.
    pub token_policy: TokenPolicy,

    /// Per-request timeout.
    pub timeout: Duration,

    /// OAuth scopes requested on refresh.
    pub scopes: Vec<String>,
}

impl OutlookConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default tenant, accepting both work and personal accounts.
    pub const DEFAULT_TENANT: &'static str = "common";

    /// Default calendar name.
    pub const DEFAULT_CALENDAR_NAME: &'static str = "Exams";

    /// Scopes needed to read and write calendar events.
    pub const DEFAULT_SCOPES: [&'static str; 2] = ["Calendars.ReadWrite", "offline_access"];

    /// Creates a configuration with defaults for everything but the credentials.
    pub fn new(credentials: AppCredentials) -> Self {
        Self {
            credentials,
            tenant: Self::DEFAULT_TENANT.to_string(),
            calendar_id: None,
            calendar_name: Self::DEFAULT_CALENDAR_NAME.to_string(),
            token_path: Self::default_token_path(),
            token_policy: TokenPolicy::default(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns the default credential file path.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examsync")
            .join("token.json")
    }

    /// Sets the tenant.
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    /// Sets an explicit calendar id.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = Some(id.into());
        self
    }

    /// Sets the calendar name used for resolution.
    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self
    }

    /// Sets the credential file path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the token policy.
    pub fn with_token_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            urlencoding::encode(&self.tenant)
        )
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.tenant.trim().is_empty() {
            return Err("tenant must not be empty".to_string());
        }

        if self.calendar_id.is_none() && self.calendar_name.trim().is_empty() {
            return Err("either calendar_id or calendar_name is required".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        Ok(())
    }
}
