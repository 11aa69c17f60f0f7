//! Selection of the calendar backend named by `calendar` in the config.

use std::path::Path;
use std::sync::Arc;

use examsync_providers::{CalendarApi, CredentialManager, CredentialStore, TokenPolicy};
use examsync_providers::{google, outlook};
use tracing::info;

use crate::config::{CalendarBackend, ClientConfig};
use crate::error::{ClientError, ClientResult};

/// Resolved provider configuration of the selected backend.
#[derive(Debug, Clone)]
pub enum Backend {
    Outlook(outlook::OutlookConfig),
    Google(google::GoogleConfig),
}

impl Backend {
    /// Resolves the section of the configured backend.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let backend = match config.calendar {
            CalendarBackend::Outlook => config
                .outlook()
                .and_then(|s| s.to_provider_config())
                .map(Self::Outlook),
            CalendarBackend::Google => config
                .google()
                .and_then(|s| s.to_provider_config())
                .map(Self::Google),
        };
        backend.map_err(ClientError::Config)
    }

    pub fn kind(&self) -> CalendarBackend {
        match self {
            Self::Outlook(_) => CalendarBackend::Outlook,
            Self::Google(_) => CalendarBackend::Google,
        }
    }

    pub fn token_path(&self) -> &Path {
        match self {
            Self::Outlook(c) => &c.token_path,
            Self::Google(c) => &c.token_path,
        }
    }

    pub fn token_policy(&self) -> TokenPolicy {
        match self {
            Self::Outlook(c) => c.token_policy,
            Self::Google(c) => c.token_policy,
        }
    }

    /// Builds the credential manager with the backend's token endpoint.
    pub fn credential_manager(&self) -> ClientResult<CredentialManager> {
        let store = CredentialStore::new(self.token_path());
        let manager = match self {
            Self::Outlook(c) => {
                CredentialManager::new(store, Box::new(outlook::OAuthClient::new(c)?))
            }
            Self::Google(c) => CredentialManager::new(store, Box::new(google::OAuthClient::new(c)?)),
        };
        Ok(manager.with_policy(self.token_policy()))
    }

    /// Opens the target calendar with `access_token`.
    pub async fn connect(&self, access_token: String) -> ClientResult<Arc<dyn CalendarApi>> {
        match self {
            Self::Outlook(c) => {
                let client = outlook::GraphCalendarClient::connect(c, access_token).await?;
                info!(backend = "outlook", calendar = %client.calendar_id(), "calendar ready");
                Ok(Arc::new(client))
            }
            Self::Google(c) => {
                let client = google::GoogleCalendarClient::from_config(c, access_token)?;
                info!(backend = "google", calendar = %client.calendar_id(), "calendar ready");
                Ok(Arc::new(client))
            }
        }
    }
}
