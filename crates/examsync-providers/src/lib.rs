//! Remote calendar access for examsync.
//!
//! - [`CalendarApi`] - the trait the reconciliation engine talks to
//! - [`RemoteEvent`], [`EventDraft`], [`EventPatch`] - what goes over it
//! - [`ProviderError`] / [`AuthError`] - error types for remote calls and credentials
//! - [`credentials`] - the stored credential and its refresh lifecycle
//! - [`outlook`] - the Microsoft Graph implementation
//! - [`google`] - the Google Calendar implementation
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐      ┌──────────────────────┐
//! │ Graph / Google API │      │  token endpoint      │
//! └─────────┬──────────┘      └──────────┬───────────┘
//!           │                            │ TokenRefresher
//!           ▼                            ▼
//! ┌────────────────────┐      ┌──────────────────────┐
//! │  calendar client   │◄─────│  CredentialManager   │
//! └─────────┬──────────┘token └──────────────────────┘
//!           │
//!           │  CalendarApi
//!           ▼
//!    ┌──────────────┐
//!    │ sync engine  │
//!    └──────────────┘
//! ```

pub mod credentials;
pub mod error;
#[cfg(feature = "google")]
pub mod google;
#[cfg(any(feature = "outlook", feature = "google"))]
mod http;
#[cfg(feature = "outlook")]
pub mod outlook;
pub mod provider;
pub mod remote_event;

pub use credentials::{
    CredentialManager, CredentialStore, StoredCredential, TokenPolicy, TokenRefresher,
    TokenResponse,
};
pub use error::{AuthError, AuthResult, ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{BoxFuture, CalendarApi};
pub use remote_event::{EventDraft, EventPatch, RemoteEvent};
