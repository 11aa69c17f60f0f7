//! Outlook calendar backend (Microsoft Graph).
//!
//! - [`GraphCalendarClient`] implements [`CalendarApi`](crate::CalendarApi)
//!   against one calendar of the signed-in user
//! - [`OAuthClient`] refreshes tokens for the shared
//!   [`CredentialManager`](crate::CredentialManager)
//!
//! # Example
//!
//! ```ignore
//! use examsync_providers::outlook::{AppCredentials, GraphCalendarClient, OAuthClient, OutlookConfig};
//! use examsync_providers::{CredentialManager, CredentialStore};
//!
//! let config = OutlookConfig::new(AppCredentials::new("client-id"));
//! let manager = CredentialManager::new(
//!     CredentialStore::new(&config.token_path),
//!     Box::new(OAuthClient::new(&config)?),
//! )
//! .with_policy(config.token_policy);
//!
//! let token = manager.access_token().await?;
//! let calendar = GraphCalendarClient::connect(&config, token).await?;
//! ```

mod client;
mod config;
mod oauth;

pub use client::{CalendarEntry, GraphCalendarClient};
pub use config::{AppCredentials, OutlookConfig};
pub use oauth::OAuthClient;
