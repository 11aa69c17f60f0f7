//! Calendar-side event types.
//!
//! [`RemoteEvent`] is the calendar's current truth for one event.
//! [`EventDraft`] and [`EventPatch`] are the bodies of create and update
//! requests; the calendar client maps them onto its wire format.

use chrono::{DateTime, Utc};

use examsync_core::{NormalizedExam, normalize_location_with};

/// An event as reported by the remote calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    /// Provider-assigned identifier, opaque to the engine.
    pub id: String,
    /// Subject as stored remotely (not normalized).
    pub subject: String,
    /// Start instant, sub-second precision dropped. `None` when the
    /// calendar reported no readable start.
    pub start: Option<DateTime<Utc>>,
    /// End instant, same rules as `start`.
    pub end: Option<DateTime<Utc>>,
    /// Location display name.
    pub location: String,
}

impl RemoteEvent {
    /// Creates a remote event.
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            start: Some(start),
            end: Some(end),
            location: location.into(),
        }
    }

    /// An event whose start or end could not be read.
    ///
    /// It still occupies its subject in the index so that the exam is not
    /// created a second time.
    pub fn unreadable(
        id: impl Into<String>,
        subject: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            start: None,
            end: None,
            location: location.into(),
        }
    }

    /// Returns true if both start and end are known.
    pub fn has_times(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    /// Free-text note stored as the event body.
    pub notes: Option<String>,
}

impl EventDraft {
    /// Builds the create body for a normalized exam.
    pub fn from_exam(exam: &NormalizedExam) -> Self {
        Self {
            subject: exam.subject.clone(),
            start: exam.start,
            end: exam.end,
            location: exam.location.clone(),
            notes: None,
        }
    }

    /// Builder: attach a note.
    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Body of an update request. Only the fields that changed are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

impl EventPatch {
    /// Computes the patch that brings `existing` in line with `desired`.
    ///
    /// The remote location goes through the same first-line and tag
    /// stripping as scraped ones before comparing. Returns `None` when
    /// nothing differs.
    pub fn between<S: AsRef<str>>(
        existing: &RemoteEvent,
        desired: &NormalizedExam,
        location_tags: &[S],
    ) -> Option<Self> {
        let remote_location = normalize_location_with(&existing.location, location_tags);
        let patch = Self {
            start: (existing.start != Some(desired.start)).then_some(desired.start),
            end: (existing.end != Some(desired.end)).then_some(desired.end),
            location: (remote_location != desired.location.trim())
                .then(|| desired.location.clone()),
        };
        (!patch.is_empty()).then_some(patch)
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.location.is_none()
    }

    /// Names of the fields carried by this patch.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.start.is_some() {
            fields.push("start");
        }
        if self.end.is_some() {
            fields.push("end");
        }
        if self.location.is_some() {
            fields.push("location");
        }
        fields
    }
}
