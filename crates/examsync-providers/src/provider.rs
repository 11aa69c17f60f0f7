//! CalendarApi trait definition.
//!
//! [`CalendarApi`] is the seam between the reconciliation engine and a remote
//! calendar. The engine lists the target calendar once per run, then issues
//! create and update calls concurrently; implementations must therefore be
//! shareable across tasks.

use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderResult;
use crate::remote_event::{EventDraft, EventPatch, RemoteEvent};

/// A boxed future for async trait methods.
///
/// Boxing keeps the trait object-safe so the engine can hold an
/// `Arc<dyn CalendarApi>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A remote calendar holding exam events.
///
/// # Example Implementation
///
/// ```ignore
/// struct GraphCalendarClient { http: reqwest::Client, /* ... */ }
///
/// impl CalendarApi for GraphCalendarClient {
///     fn name(&self) -> &str { "outlook" }
///
///     fn list_events(&self) -> BoxFuture<'_, ProviderResult<Vec<RemoteEvent>>> {
///         Box::pin(async move {
///             // GET the event collection, following pagination
///             Ok(events)
///         })
///     }
///     // ... other methods
/// }
/// ```
pub trait CalendarApi: Send + Sync {
    /// Returns the name of this calendar backend (e.g. "outlook").
    fn name(&self) -> &str;

    /// Lists every event in the target calendar.
    ///
    /// Implementations handle pagination internally so the result is the
    /// complete collection. Events whose timestamps cannot be read are left
    /// out.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on any non-success response or transport
    /// failure.
    fn list_events(&self) -> BoxFuture<'_, ProviderResult<Vec<RemoteEvent>>>;

    /// Creates an event and returns its identifier.
    fn create_event<'a>(&'a self, draft: &'a EventDraft) -> BoxFuture<'a, ProviderResult<String>>;

    /// Applies a partial update to the event with the given identifier.
    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}
