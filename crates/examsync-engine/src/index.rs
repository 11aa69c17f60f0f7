//! Remote event index.
//!
//! A snapshot of the target calendar keyed by normalized subject. Built once
//! per run before any mutation and shared read-only by the workers.

use std::collections::HashMap;

use examsync_core::normalize_subject;
use examsync_providers::{CalendarApi, ProviderResult, RemoteEvent};
use tracing::{debug, warn};

/// Result of looking up a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// No remote event has this subject.
    Missing,
    /// Exactly one remote event has this subject.
    Found(&'a RemoteEvent),
    /// Several remote events normalize to this subject.
    Ambiguous(usize),
    /// The only event with this subject has no readable start or end.
    Unreadable(&'a RemoteEvent),
}

/// Remote events keyed by `normalize_subject(event.subject)`.
#[derive(Debug, Default)]
pub struct RemoteEventIndex {
    by_subject: HashMap<String, Vec<RemoteEvent>>,
    event_count: usize,
}

impl RemoteEventIndex {
    /// Builds an index from a full listing.
    ///
    /// Events whose subjects collide are all kept; lookups of that subject
    /// report [`Lookup::Ambiguous`].
    pub fn from_events(events: impl IntoIterator<Item = RemoteEvent>) -> Self {
        let mut by_subject: HashMap<String, Vec<RemoteEvent>> = HashMap::new();
        let mut event_count = 0;
        for event in events {
            event_count += 1;
            by_subject
                .entry(normalize_subject(&event.subject))
                .or_default()
                .push(event);
        }

        let index = Self {
            by_subject,
            event_count,
        };
        for (subject, events) in index.by_subject.iter().filter(|(_, e)| e.len() > 1) {
            warn!(subject = %subject, count = events.len(), "remote subject collision");
        }
        index
    }

    /// Looks up a normalized subject.
    pub fn lookup(&self, subject: &str) -> Lookup<'_> {
        match self.by_subject.get(subject).map(Vec::as_slice) {
            None | Some([]) => Lookup::Missing,
            Some([event]) if !event.has_times() => Lookup::Unreadable(event),
            Some([event]) => Lookup::Found(event),
            Some(events) => Lookup::Ambiguous(events.len()),
        }
    }

    /// Returns the first event listed under `subject`.
    pub fn find(&self, subject: &str) -> Option<&RemoteEvent> {
        self.by_subject.get(subject).and_then(|events| events.first())
    }

    /// Returns true if more than one remote event maps to `subject`.
    pub fn has_collision(&self, subject: &str) -> bool {
        self.by_subject.get(subject).is_some_and(|e| e.len() > 1)
    }

    /// Subjects shared by more than one remote event.
    pub fn collisions(&self) -> impl Iterator<Item = &str> {
        self.by_subject
            .iter()
            .filter(|(_, events)| events.len() > 1)
            .map(|(subject, _)| subject.as_str())
    }

    /// Number of distinct subjects.
    pub fn subject_count(&self) -> usize {
        self.by_subject.len()
    }

    /// Number of indexed events.
    pub fn len(&self) -> usize {
        self.event_count
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }
}

/// Lists the remote calendar once and indexes the result.
pub async fn fetch_index(api: &dyn CalendarApi) -> ProviderResult<RemoteEventIndex> {
    let events = api.list_events().await?;
    let index = RemoteEventIndex::from_events(events);
    debug!(
        provider = api.name(),
        events = index.len(),
        subjects = index.subject_count(),
        "built remote event index"
    );
    Ok(index)
}
