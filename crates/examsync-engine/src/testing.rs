//! In-memory calendar and fixtures for engine tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use examsync_core::NormalizedExam;
use examsync_providers::{
    BoxFuture, CalendarApi, EventDraft, EventPatch, ProviderError, ProviderResult, RemoteEvent,
};

/// 2025-03-27T01:00:00Z plus `hours`.
pub fn at(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 27, 1, 0, 0).unwrap() + TimeDelta::hours(hours)
}

/// A one-hour remote event starting `hours` after the base instant.
pub fn remote(id: &str, subject: &str, hours: i64, location: &str) -> RemoteEvent {
    RemoteEvent::new(id, subject, at(hours), at(hours + 1), location)
}

/// The normalized exam matching [`remote`] with the same arguments.
pub fn exam(subject: &str, hours: i64, location: &str) -> NormalizedExam {
    NormalizedExam {
        subject: subject.to_string(),
        start: at(hours),
        end: at(hours + 1),
        location: location.to_string(),
    }
}

/// A calendar held in memory, with scripted failures.
#[derive(Default)]
pub struct MemoryCalendar {
    events: Mutex<Vec<RemoteEvent>>,
    drafts: Mutex<Vec<EventDraft>>,
    list_failure: Mutex<Option<ProviderError>>,
    /// Per subject: (status, body) answers returned before a call succeeds.
    create_failures: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    update_failures: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    /// Per subject: statuses answered after the event was stored anyway.
    lost_responses: Mutex<HashMap<String, VecDeque<u16>>>,
    panic_on: Mutex<HashSet<String>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl MemoryCalendar {
    pub fn with_events(events: Vec<RemoteEvent>) -> Self {
        let calendar = Self::default();
        *calendar.events.lock().unwrap() = events;
        calendar
    }

    pub fn fail_listing(&self, error: ProviderError) {
        *self.list_failure.lock().unwrap() = Some(error);
    }

    /// Makes the next `times` creates of `subject` answer `status`.
    pub fn fail_create(&self, subject: &str, status: u16, times: usize) {
        let mut failures = self.create_failures.lock().unwrap();
        let queue = failures.entry(subject.to_string()).or_default();
        queue.extend((0..times).map(|_| (status, format!("{{\"error\":\"{status}\"}}"))));
    }

    /// Makes the next `times` updates of event `id` answer `status`.
    pub fn fail_update(&self, id: &str, status: u16, times: usize) {
        let mut failures = self.update_failures.lock().unwrap();
        let queue = failures.entry(id.to_string()).or_default();
        queue.extend((0..times).map(|_| (status, format!("{{\"error\":\"{status}\"}}"))));
    }

    /// Makes the next `times` creates of `subject` store the event, then
    /// answer `status` as if the response was lost.
    pub fn fail_after_create(&self, subject: &str, status: u16, times: usize) {
        let mut lost = self.lost_responses.lock().unwrap();
        lost.entry(subject.to_string())
            .or_default()
            .extend(std::iter::repeat_n(status, times));
    }

    /// Panics inside any create of `subject`.
    pub fn panic_on_create(&self, subject: &str) {
        self.panic_on.lock().unwrap().insert(subject.to_string());
    }

    pub fn events(&self) -> Vec<RemoteEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn drafts(&self) -> Vec<EventDraft> {
        self.drafts.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.create_calls() + self.update_calls()
    }

    fn next_failure(
        failures: &Mutex<HashMap<String, VecDeque<(u16, String)>>>,
        key: &str,
    ) -> Option<ProviderError> {
        failures
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front)
            .map(|(status, body)| ProviderError::from_response(status, body, "scripted failure"))
    }
}

impl CalendarApi for MemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_events(&self) -> BoxFuture<'_, ProviderResult<Vec<RemoteEvent>>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let result = match self.list_failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(self.events()),
        };
        Box::pin(async move { result })
    }

    fn create_event<'a>(&'a self, draft: &'a EventDraft) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
            let should_panic = self.panic_on.lock().unwrap().contains(&draft.subject);
            if should_panic {
                panic!("scripted panic for {}", draft.subject);
            }
            if let Some(error) = Self::next_failure(&self.create_failures, &draft.subject) {
                return Err(error);
            }

            let id = format!("new-{n}");
            self.drafts.lock().unwrap().push(draft.clone());
            self.events.lock().unwrap().push(RemoteEvent::new(
                id.clone(),
                draft.subject.clone(),
                draft.start,
                draft.end,
                draft.location.clone(),
            ));

            let lost = self
                .lost_responses
                .lock()
                .unwrap()
                .get_mut(&draft.subject)
                .and_then(VecDeque::pop_front);
            if let Some(status) = lost {
                return Err(ProviderError::from_response(status, "", "upstream error"));
            }
            Ok(id)
        })
    }

    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = Self::next_failure(&self.update_failures, event_id) {
                return Err(error);
            }

            let mut events = self.events.lock().unwrap();
            let event = events
                .iter_mut()
                .find(|e| e.id == event_id)
                .ok_or_else(|| ProviderError::from_response(404, "", "no such event"))?;
            if let Some(start) = patch.start {
                event.start = Some(start);
            }
            if let Some(end) = patch.end {
                event.end = Some(end);
            }
            if let Some(location) = &patch.location {
                event.location = location.clone();
            }
            Ok(())
        })
    }
}
