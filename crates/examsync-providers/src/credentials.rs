//! Credential storage and the access-token lifecycle.
//!
//! The credential file is written by the interactive authorization flow and
//! refreshed in place by [`CredentialManager`]. Its layout:
//!
//! ```json
//! { "access_token": "...", "refresh_token": "...", "expires_at": 1742950000 }
//! ```
//!
//! `expires_at` is in Unix seconds; fractional values are accepted. Any other
//! field is carried through refreshes untouched.
//!
//! Both calendar backends share this module; only the [`TokenRefresher`]
//! differs.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult, ProviderResult};
use crate::provider::BoxFuture;

/// A bearer credential as persisted on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, with = "unix_seconds", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Fields this crate does not interpret (`scope`, `token_type`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredCredential {
    /// Returns true if an expiry is recorded and has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Returns true if the credential can be refreshed.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn usable_access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// `Option<DateTime<Utc>>` as (possibly fractional) Unix seconds.
mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_i64(at.timestamp()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let Some(secs) = Option::<f64>::deserialize(deserializer)? else {
            return Ok(None);
        };
        DateTime::from_timestamp(secs.trunc() as i64, 0)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expires_at out of range: {secs}")))
    }
}

/// File-backed credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store at the given path. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored credential.
    ///
    /// An absent file yields `None`. So does an unreadable or malformed one,
    /// with a warning.
    pub fn load(&self) -> Option<StoredCredential> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no credential file");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read credential file");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed credential file");
                None
            }
        }
    }

    /// Replaces the stored credential atomically.
    ///
    /// Writes a sibling temporary file, then renames it over the store. On
    /// Unix the file is created with mode 0600.
    pub fn save(&self, credential: &StoredCredential) -> AuthResult<()> {
        let persist = |source: io::Error| AuthError::Persist {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persist)?;
        }

        let content = serde_json::to_vec_pretty(credential)
            .map_err(|e| persist(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&temp_path).map_err(persist)?;
        file.write_all(&content).map_err(persist)?;
        file.sync_all().map_err(persist)?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(persist)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)).map_err(persist)?;
        }

        debug!(path = %self.path.display(), "saved credential");
        Ok(())
    }
}

/// When a stored access token is considered usable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPolicy {
    /// Use any stored access token without looking at its expiry.
    #[default]
    TrustCache,
    /// Refresh a stored access token whose expiry has passed.
    CheckExpiry,
}

impl std::fmt::Display for TokenPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::TrustCache => "trust-cache",
            Self::CheckExpiry => "check-expiry",
        })
    }
}

/// A successful answer from the identity provider's token endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Everything else the endpoint returned; persisted with the credential.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Exchanges a refresh token for a new access token.
pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<TokenResponse>>;
}

/// Owns the credential lifecycle: load, refresh, persist.
pub struct CredentialManager {
    store: CredentialStore,
    refresher: Box<dyn TokenRefresher>,
    policy: TokenPolicy,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// Creates a manager over `store` using the default [`TokenPolicy`].
    pub fn new(store: CredentialStore, refresher: Box<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            policy: TokenPolicy::default(),
        }
    }

    /// Builder: set the token policy.
    #[must_use]
    pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Returns the active token policy.
    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Reads the stored credential, if any.
    pub fn load_credential(&self) -> Option<StoredCredential> {
        self.store.load()
    }

    /// Returns an access token usable for remote calls.
    ///
    /// A stored access token is returned as-is, unless the policy is
    /// [`TokenPolicy::CheckExpiry`] and its expiry has passed. Otherwise the
    /// refresh token is exchanged and the new credential persisted.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NoCredential`] when neither token is stored
    /// - [`AuthError::Expired`] when the access token expired and cannot be refreshed
    /// - [`AuthError::Refresh`] / [`AuthError::Persist`] when refreshing fails
    pub async fn access_token(&self) -> AuthResult<String> {
        let credential = self.load_credential().unwrap_or_default();

        if let Some(token) = credential.usable_access_token() {
            let expired = self.policy == TokenPolicy::CheckExpiry
                && credential.is_expired_at(Utc::now());
            if !expired {
                return Ok(token.to_string());
            }
            if !credential.has_refresh_token() {
                return Err(AuthError::Expired);
            }
            debug!("stored access token expired, refreshing");
        }

        if credential.has_refresh_token() {
            let refreshed = self.refresh_with(credential).await?;
            return refreshed.access_token.ok_or(AuthError::Expired);
        }

        Err(AuthError::NoCredential {
            path: self.store.path().display().to_string(),
        })
    }

    /// Refreshes unconditionally and returns the new credential.
    pub async fn refresh(&self) -> AuthResult<StoredCredential> {
        let credential = self
            .load_credential()
            .filter(StoredCredential::has_refresh_token)
            .ok_or_else(|| AuthError::NoCredential {
                path: self.store.path().display().to_string(),
            })?;
        self.refresh_with(credential).await
    }

    async fn refresh_with(&self, previous: StoredCredential) -> AuthResult<StoredCredential> {
        let StoredCredential {
            refresh_token,
            mut extra,
            ..
        } = previous;
        let refresh_token = refresh_token.unwrap_or_default();
        let response = self
            .refresher
            .refresh(&refresh_token)
            .await
            .map_err(AuthError::Refresh)?;

        let expires_at = response.expires_in.and_then(|secs| {
            let at = TimeDelta::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d));
            if at.is_none() {
                warn!(expires_in = secs, "ignoring out-of-range token lifetime");
            }
            at
        });
        // a response field named expires_at would collide with ours
        extra.extend(
            response
                .extra
                .into_iter()
                .filter(|(key, _)| key != "expires_at"),
        );

        let credential = StoredCredential {
            access_token: Some(response.access_token),
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .or(Some(refresh_token)),
            expires_at,
            extra,
        };

        self.store.save(&credential)?;
        info!(path = %self.store.path().display(), "refreshed access token");
        Ok(credential)
    }
}
