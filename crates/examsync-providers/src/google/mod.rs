//! Google Calendar backend.
//!
//! - [`GoogleCalendarClient`] implements [`CalendarApi`](crate::CalendarApi)
//!   against one calendar, `primary` by default
//! - [`OAuthClient`] refreshes tokens for the shared
//!   [`CredentialManager`](crate::CredentialManager)
//!
//! # Example
//!
//! ```ignore
//! use examsync_providers::google::{GoogleCalendarClient, GoogleConfig, OAuthClient, OAuthCredentials};
//! use examsync_providers::{CredentialManager, CredentialStore};
//!
//! let config = GoogleConfig::new(OAuthCredentials::new("id.apps.googleusercontent.com", "secret"));
//! let manager = CredentialManager::new(
//!     CredentialStore::new(&config.token_path),
//!     Box::new(OAuthClient::new(&config)?),
//! );
//!
//! let token = manager.access_token().await?;
//! let calendar = GoogleCalendarClient::from_config(&config, token)?;
//! ```

mod client;
mod config;
mod oauth;

pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::OAuthClient;
