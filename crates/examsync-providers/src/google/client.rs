//! Google Calendar API v3 client.
//!
//! - `GET   /calendars/{id}/events` (paged through `nextPageToken`)
//! - `POST  /calendars/{id}/events`
//! - `PATCH /calendars/{id}/events/{event-id}`
//!
//! Times are sent as UTC `dateTime` values. Listed times carry their own
//! offset and are converted to UTC on read.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use examsync_core::{format_timestamp, parse_remote_timestamp};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{self, read_body, send_error};
use crate::provider::{BoxFuture, CalendarApi};
use crate::remote_event::{EventDraft, EventPatch, RemoteEvent};

use super::config::GoogleConfig;

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Largest page the events endpoint serves.
const PAGE_SIZE: &str = "250";

/// Google Calendar client bound to one calendar.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(
        access_token: impl Into<String>,
        calendar_id: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::client(timeout)?,
            access_token: access_token.into(),
            base_url: CALENDAR_API_BASE.to_string(),
            calendar_id: calendar_id.into(),
        })
    }

    /// Creates a client for the calendar configured in `config`.
    pub fn from_config(config: &GoogleConfig, access_token: impl Into<String>) -> ProviderResult<Self> {
        Self::new(access_token, config.calendar_id.clone(), config.timeout)
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// Fetches every event of the target calendar, following `nextPageToken`.
    ///
    /// Cancelled events are left out.
    pub async fn fetch_events(&self) -> ProviderResult<Vec<RemoteEvent>> {
        let url = self.events_url();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[("maxResults", PAGE_SIZE), ("singleEvents", "true")]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await.map_err(send_error)?;
            let body = read_body(response, "listing failed", |s| s.is_success()).await?;
            let page: EventListResponse = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse response: {}", e))
            })?;

            events.extend(
                page.items
                    .into_iter()
                    .filter(|event| event.status.as_deref() != Some("cancelled"))
                    .map(convert_event),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = events.len(), calendar = %self.calendar_id, "fetched events");
        Ok(events)
    }

    /// Inserts an event and returns its id.
    pub async fn insert_event(&self, draft: &EventDraft) -> ProviderResult<String> {
        let response = self
            .http_client
            .post(self.events_url())
            .bearer_auth(&self.access_token)
            .json(&ApiNewEvent::from(draft))
            .send()
            .await
            .map_err(send_error)?;

        let body = read_body(response, "create event failed", |s| s.is_success()).await?;
        match serde_json::from_str::<ApiCreated>(&body) {
            Ok(created) => Ok(created.id),
            Err(e) => {
                warn!(subject = %draft.subject, error = %e, "created event but could not read its id");
                Ok(String::new())
            }
        }
    }

    /// Applies a partial update to an event.
    pub async fn patch_event(&self, event_id: &str, patch: &EventPatch) -> ProviderResult<()> {
        let response = self
            .http_client
            .patch(self.event_url(event_id))
            .bearer_auth(&self.access_token)
            .json(&ApiEventPatch::from(patch))
            .send()
            .await
            .map_err(send_error)?;

        read_body(response, "update event failed", |s| s.is_success()).await?;
        Ok(())
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    fn list_events(&self) -> BoxFuture<'_, ProviderResult<Vec<RemoteEvent>>> {
        Box::pin(self.fetch_events())
    }

    fn create_event<'a>(&'a self, draft: &'a EventDraft) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.insert_event(draft))
    }

    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.patch_event(event_id, patch))
    }
}

/// Converts a listed event. All-day events and unreadable times become
/// [`RemoteEvent::unreadable`].
fn convert_event(event: ApiEvent) -> RemoteEvent {
    let subject = event.summary.unwrap_or_default();
    let location = event.location.unwrap_or_default();

    let parse = |time: Option<&ApiEventTime>| -> Result<DateTime<Utc>, String> {
        let date_time = time
            .and_then(|t| t.date_time.as_deref())
            .ok_or_else(|| "no dateTime".to_string())?;
        parse_remote_timestamp(date_time).map_err(|e| e.to_string())
    };
    match (parse(event.start.as_ref()), parse(event.end.as_ref())) {
        (Ok(start), Ok(end)) => RemoteEvent::new(event.id, subject, start, end, location),
        (Err(e), _) | (_, Err(e)) => {
            warn!(id = %event.id, subject = %subject, error = %e, "event has no readable start or end");
            RemoteEvent::unreadable(event.id, subject, location)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    location: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    /// Absent on all-day events, which carry a `date` instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl ApiEventTime {
    fn utc(instant: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(format_timestamp(instant)),
            time_zone: Some("UTC".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiCreated {
    id: String,
}

/// POST body.
#[derive(Debug, Serialize)]
struct ApiNewEvent {
    summary: String,
    location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: ApiEventTime,
    end: ApiEventTime,
}

impl From<&EventDraft> for ApiNewEvent {
    fn from(draft: &EventDraft) -> Self {
        Self {
            summary: draft.subject.clone(),
            location: draft.location.clone(),
            description: draft.notes.clone(),
            start: ApiEventTime::utc(draft.start),
            end: ApiEventTime::utc(draft.end),
        }
    }
}

/// PATCH body; absent fields are left unchanged.
#[derive(Debug, Serialize)]
struct ApiEventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<ApiEventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<ApiEventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

impl From<&EventPatch> for ApiEventPatch {
    fn from(patch: &EventPatch) -> Self {
        Self {
            start: patch.start.map(ApiEventTime::utc),
            end: patch.end.map(ApiEventTime::utc),
            location: patch.location.clone(),
        }
    }
}
