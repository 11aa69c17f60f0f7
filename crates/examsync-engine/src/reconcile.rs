//! Per-exam reconciliation: decide against the index, then apply.

use examsync_core::NormalizedExam;
use examsync_providers::{CalendarApi, EventDraft, EventPatch, ProviderError};
use tracing::{debug, info, warn};

use crate::dispatch::RetryPolicy;
use crate::index::{Lookup, RemoteEventIndex};
use crate::report::ExamState;

/// What has to happen to bring the calendar in line with one exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// The remote event already matches.
    NoOp,
    /// No remote event has this subject.
    Create(EventDraft),
    /// The remote event differs in the fields set on `patch`.
    Update { event_id: String, patch: EventPatch },
    /// Several remote events share the subject; nothing is sent.
    Conflict(String),
}

/// Decides the action for `exam` given the pre-fetched index.
///
/// Start, end and location are compared; the subject is the join key and
/// never changes. Remote locations are stripped of `location_tags` first.
pub fn plan<S: AsRef<str>>(
    exam: &NormalizedExam,
    index: &RemoteEventIndex,
    notes: Option<&str>,
    location_tags: &[S],
) -> Action {
    match index.lookup(&exam.subject) {
        Lookup::Missing => {
            Action::Create(EventDraft::from_exam(exam).with_notes(notes.map(String::from)))
        }
        Lookup::Ambiguous(count) => {
            Action::Conflict(format!("duplicate remote subject ({} events)", count))
        }
        Lookup::Unreadable(existing) => Action::Conflict(format!(
            "remote event {} has no readable start or end",
            existing.id
        )),
        Lookup::Found(existing) => match EventPatch::between(existing, exam, location_tags) {
            Some(patch) => Action::Update {
                event_id: existing.id.clone(),
                patch,
            },
            None => Action::NoOp,
        },
    }
}

/// Applies planned actions through a [`CalendarApi`].
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    notes: Option<String>,
    location_tags: Vec<String>,
    retry: RetryPolicy,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..Default::default()
        }
    }

    /// Builder: note stored as the body of created events.
    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self
    }

    /// Builder: tags stripped from remote locations before comparing.
    #[must_use]
    pub fn with_location_tags(mut self, tags: Vec<String>) -> Self {
        self.location_tags = tags;
        self
    }

    /// Builder: plan only, never mutate.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn plan(&self, exam: &NormalizedExam, index: &RemoteEventIndex) -> Action {
        plan(exam, index, self.notes.as_deref(), &self.location_tags)
    }

    /// Carries out `action` for the exam with the given subject.
    pub async fn apply(&self, api: &dyn CalendarApi, subject: &str, action: Action) -> ExamState {
        match action {
            Action::NoOp => {
                debug!(%subject, "unchanged");
                ExamState::Unchanged
            }
            Action::Conflict(reason) => {
                warn!(%subject, %reason, "cannot reconcile");
                ExamState::Failed(reason)
            }
            Action::Create(_) if self.dry_run => ExamState::Created,
            Action::Update { patch, .. } if self.dry_run => ExamState::Updated {
                fields: patch.changed_fields(),
            },
            Action::Create(draft) => {
                // A 5xx other than 503 may follow a create that went through.
                let created = self
                    .retry
                    .run_when(subject, || api.create_event(&draft), ProviderError::is_unprocessed)
                    .await;
                match created {
                    Ok(id) => {
                        info!(%subject, %id, "created event");
                        ExamState::Created
                    }
                    Err(e) => {
                        warn!(%subject, error = %e, "create failed");
                        ExamState::Failed(e.to_string())
                    }
                }
            }
            Action::Update { event_id, patch } => {
                let fields = patch.changed_fields();
                match self
                    .retry
                    .run(subject, || api.update_event(&event_id, &patch))
                    .await
                {
                    Ok(()) => {
                        info!(%subject, id = %event_id, ?fields, "updated event");
                        ExamState::Updated { fields }
                    }
                    Err(e) => {
                        warn!(%subject, id = %event_id, error = %e, "update failed");
                        ExamState::Failed(e.to_string())
                    }
                }
            }
        }
    }

    /// Plans and applies in one step.
    pub async fn reconcile(
        &self,
        api: &dyn CalendarApi,
        index: &RemoteEventIndex,
        exam: &NormalizedExam,
    ) -> ExamState {
        let action = self.plan(exam, index);
        self.apply(api, &exam.subject, action).await
    }
}
