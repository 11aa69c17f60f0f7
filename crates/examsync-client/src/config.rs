//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/examsync/config.toml` by default.
//!
//! `calendar` picks the backend (`outlook`, the default, or `google`); each
//! backend reads its own section.
//!
//! Credential values (`client_id`, `client_secret`) support secret references
//! (`pass::path/in/store`, `env::VAR_NAME` or plain text), see [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use examsync_core::{DEFAULT_LOCATION_TAG, DEFAULT_SOURCE_TIMEZONE, Normalizer};
use examsync_engine::{DEFAULT_EVENT_NOTES, RetryPolicy, SyncOptions};
use examsync_providers::TokenPolicy;
use examsync_providers::google::{GoogleConfig, OAuthCredentials};
use examsync_providers::outlook::{AppCredentials, OutlookConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the examsync client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Calendar backend synced into.
    pub calendar: CalendarBackend,

    /// Outlook calendar settings.
    pub outlook: Option<OutlookSettings>,

    /// Google Calendar settings.
    pub google: Option<GoogleSettings>,

    /// Sync run settings.
    pub sync: SyncSettings,
}

impl ClientConfig {
    /// Loads configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examsync")
            .join("config.toml")
    }

    /// Returns the `[google]` section or explains how to add it.
    pub fn google(&self) -> Result<&GoogleSettings, String> {
        self.google.as_ref().ok_or_else(|| {
            format!(
                "Google Calendar is not configured. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_CLIENT_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"env::GOOGLE_CLIENT_SECRET\"",
                Self::default_path().display()
            )
        })
    }

    /// Returns the `[outlook]` section or explains how to add it.
    pub fn outlook(&self) -> Result<&OutlookSettings, String> {
        self.outlook.as_ref().ok_or_else(|| {
            format!(
                "Outlook is not configured. Add to {}:\n  \
                 [outlook]\n  \
                 client_id = \"YOUR_APPLICATION_ID\"",
                Self::default_path().display()
            )
        })
    }
}

/// Calendar backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarBackend {
    #[default]
    Outlook,
    Google,
}

impl std::fmt::Display for CalendarBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Outlook => "outlook",
            Self::Google => "google",
        })
    }
}

/// Outlook (Microsoft Graph) settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlookSettings {
    /// Application (client) id; supports `pass::` and `env::` prefixes.
    pub client_id: Option<String>,

    /// Client secret for confidential registrations; same prefixes.
    pub client_secret: Option<String>,

    /// Directory tenant, `common` when unset.
    pub tenant: Option<String>,

    /// Target calendar id. When unset the calendar is looked up by name.
    pub calendar_id: Option<String>,

    /// Calendar name, `Exams` when unset.
    pub calendar_name: Option<String>,

    /// Credential file location.
    pub token_path: Option<PathBuf>,

    pub token_policy: TokenPolicy,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

impl OutlookSettings {
    /// Builds the provider configuration, resolving secret references.
    pub fn to_provider_config(&self) -> Result<OutlookConfig, String> {
        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(str::to_string)?;

        let mut config = OutlookConfig::new(credentials).with_token_policy(self.token_policy);
        if let Some(ref tenant) = self.tenant {
            config = config.with_tenant(tenant);
        }
        if let Some(ref id) = self.calendar_id {
            config = config.with_calendar_id(id);
        }
        if let Some(ref name) = self.calendar_name {
            config = config.with_calendar_name(name);
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub(crate) fn resolve_credentials(&self) -> Result<AppCredentials, String> {
        let raw_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| "client_id is missing from the [outlook] section".to_string())?;
        let client_id = crate::secret::resolve(raw_id)
            .map_err(|e| format!("failed to resolve client_id: {}", e))?;

        let mut credentials = AppCredentials::new(client_id);
        if let Some(raw_secret) = self.client_secret.as_deref() {
            let secret = crate::secret::resolve(raw_secret)
                .map_err(|e| format!("failed to resolve client_secret: {}", e))?;
            credentials = credentials.with_secret(secret);
        }
        Ok(credentials)
    }
}

/// Google Calendar settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client id; supports `pass::` and `env::` prefixes.
    pub client_id: Option<String>,

    /// OAuth client secret; same prefixes.
    pub client_secret: Option<String>,

    /// Target calendar, `primary` when unset.
    pub calendar_id: Option<String>,

    /// Credential file location.
    pub token_path: Option<PathBuf>,

    pub token_policy: TokenPolicy,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,
}

impl GoogleSettings {
    /// Builds the provider configuration, resolving secret references.
    pub fn to_provider_config(&self) -> Result<GoogleConfig, String> {
        let resolve = |name: &str, value: Option<&str>| {
            let raw = value.ok_or_else(|| format!("{} is missing from the [google] section", name))?;
            crate::secret::resolve(raw).map_err(|e| format!("failed to resolve {}: {}", name, e))
        };
        let credentials = OAuthCredentials::new(
            resolve("client_id", self.client_id.as_deref())?,
            resolve("client_secret", self.client_secret.as_deref())?,
        );

        let mut config = GoogleConfig::new(credentials).with_token_policy(self.token_policy);
        if let Some(ref id) = self.calendar_id {
            config = config.with_calendar_id(id);
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }
}

/// Settings for the sync run itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// IANA zone the schedule page prints times in.
    pub source_timezone: String,

    /// Prefix tags stripped from locations.
    pub location_tags: Vec<String>,

    /// Concurrent workers; derived from the CPU count when unset.
    pub max_workers: Option<usize>,

    /// Attempts per create or update, including the first.
    pub max_attempts: u32,

    /// Body of created events; empty disables it.
    pub event_notes: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            source_timezone: DEFAULT_SOURCE_TIMEZONE.name().to_string(),
            location_tags: vec![DEFAULT_LOCATION_TAG.to_string()],
            max_workers: None,
            max_attempts: 3,
            event_notes: DEFAULT_EVENT_NOTES.to_string(),
        }
    }
}

impl SyncSettings {
    pub fn timezone(&self) -> Result<Tz, String> {
        self.source_timezone
            .parse::<Tz>()
            .map_err(|e| format!("invalid source_timezone `{}`: {}", self.source_timezone, e))
    }

    pub fn normalizer(&self) -> Result<Normalizer, String> {
        Ok(Normalizer::new(self.timezone()?).with_location_tags(self.location_tags.clone()))
    }

    /// Builds the engine options for one run.
    pub fn sync_options(&self, dry_run: bool) -> Result<SyncOptions, String> {
        self.validate()?;
        let mut options = SyncOptions::default()
            .with_dry_run(dry_run)
            .with_retry(RetryPolicy::new(self.max_attempts))
            .with_event_notes(Some(self.event_notes.clone()));
        if let Some(workers) = self.max_workers {
            options = options.with_max_workers(workers);
        }
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.timezone()?;
        if self.max_workers == Some(0) {
            return Err("max_workers must be at least 1".to_string());
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.location_tags.iter().any(|t| t.trim().is_empty()) {
            return Err("location_tags must not contain empty tags".to_string());
        }
        Ok(())
    }
}
