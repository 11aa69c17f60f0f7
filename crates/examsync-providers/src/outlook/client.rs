//! Microsoft Graph calendar client.
//!
//! Talks to the v1.0 events collection of a single calendar:
//!
//! - `GET    /me/calendars/{id}/events` (paged through `@odata.nextLink`)
//! - `POST   /me/calendars/{id}/events` (expects 201)
//! - `PATCH  /me/calendars/{id}/events/{event-id}` (expects 2xx)
//!
//! Listings are requested with `Prefer: outlook.timezone="UTC"` so every
//! `dateTime` in a response is UTC wall-clock time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use examsync_core::{format_timestamp, parse_remote_timestamp};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{self, read_body, send_error};
use crate::provider::{BoxFuture, CalendarApi};
use crate::remote_event::{EventDraft, EventPatch, RemoteEvent};

use super::config::OutlookConfig;

/// Base URL for Microsoft Graph v1.0.
const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Page size requested from list endpoints.
const PAGE_SIZE: &str = "100";

/// Header asking Graph to report event times in UTC.
const PREFER_UTC: &str = "outlook.timezone=\"UTC\"";

/// Graph calendar client bound to one calendar.
#[derive(Debug)]
pub struct GraphCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
    calendar_id: String,
}

impl GraphCalendarClient {
    /// Creates a client for the given calendar id.
    pub fn new(
        access_token: impl Into<String>,
        calendar_id: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::client(timeout)?,
            access_token: access_token.into(),
            base_url: GRAPH_API_BASE.to_string(),
            calendar_id: calendar_id.into(),
        })
    }

    /// Creates a client for the calendar configured in `config`.
    ///
    /// Without an explicit calendar id, the calendar named
    /// `config.calendar_name` is looked up and created if missing.
    pub async fn connect(
        config: &OutlookConfig,
        access_token: impl Into<String>,
    ) -> ProviderResult<Self> {
        let mut client = Self::new(
            access_token,
            config.calendar_id.clone().unwrap_or_default(),
            config.timeout,
        )?;
        if config.calendar_id.is_none() {
            client.calendar_id = client.find_or_create_calendar(&config.calendar_name).await?;
        }
        Ok(client)
    }

    /// Overrides the Graph base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the target calendar id.
    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn events_url(&self) -> String {
        format!(
            "{}/me/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// Returns the id of the calendar with the given name, creating it if needed.
    pub async fn find_or_create_calendar(&self, name: &str) -> ProviderResult<String> {
        let calendars = self.list_calendars().await?;
        if let Some(calendar) = calendars.into_iter().find(|c| c.name == name) {
            debug!(calendar = %name, id = %calendar.id, "found calendar");
            return Ok(calendar.id);
        }

        info!(calendar = %name, "calendar not found, creating it");
        let url = format!("{}/me/calendars", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&NewCalendar { name })
            .send()
            .await
            .map_err(send_error)?;
        let body = read_body(response, "create calendar failed", |s| s.is_success()).await?;
        let created: ApiCalendar = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse created calendar: {}", e))
        })?;
        Ok(created.id)
    }

    /// Lists the signed-in user's calendars.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarEntry>> {
        let first = format!("{}/me/calendars", self.base_url);
        let pages: Vec<CalendarListResponse> = self.get_all_pages(&first, &[]).await?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.value)
            .map(|c| CalendarEntry {
                id: c.id,
                name: c.name.unwrap_or_default(),
            })
            .collect())
    }

    /// Follows `@odata.nextLink` from `first` until the last page.
    async fn get_all_pages<T>(&self, first: &str, query: &[(&str, &str)]) -> ProviderResult<Vec<T>>
    where
        T: for<'de> Deserialize<'de> + NextLink,
    {
        let mut pages = Vec::new();
        let mut next: Option<String> = None;

        loop {
            let request = match next.as_deref() {
                // nextLink already carries the query
                Some(url) => self.http_client.get(url),
                None => self.http_client.get(first).query(query),
            };

            let response = request
                .bearer_auth(&self.access_token)
                .header("Prefer", PREFER_UTC)
                .send()
                .await
                .map_err(send_error)?;

            let body = read_body(response, "listing failed", |s| s.is_success()).await?;
            let page: T = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse response: {}", e))
            })?;

            next = page.next_link().map(String::from);
            pages.push(page);
            if next.is_none() {
                break;
            }
        }

        Ok(pages)
    }

    /// Fetches every event of the target calendar.
    pub async fn fetch_events(&self) -> ProviderResult<Vec<RemoteEvent>> {
        let url = self.events_url();
        let pages: Vec<EventListResponse> = self
            .get_all_pages(
                &url,
                &[("$top", PAGE_SIZE), ("$select", "id,subject,start,end,location")],
            )
            .await?;

        let events: Vec<RemoteEvent> = pages
            .into_iter()
            .flat_map(|page| page.value)
            .map(convert_event)
            .collect();

        debug!(count = events.len(), calendar = %self.calendar_id, "fetched events");
        Ok(events)
    }

    /// Creates an event; success is exactly 201 Created.
    pub async fn post_event(&self, draft: &EventDraft) -> ProviderResult<String> {
        let response = self
            .http_client
            .post(self.events_url())
            .bearer_auth(&self.access_token)
            .json(&ApiNewEvent::from(draft))
            .send()
            .await
            .map_err(send_error)?;

        let body = read_body(response, "create event failed", |s| s == StatusCode::CREATED).await?;
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
            .json(&ApiEventUpdate::from(patch))
            .send()
            .await
            .map_err(send_error)?;

        read_body(response, "update event failed", |s| s.is_success()).await?;
        Ok(())
    }
}

impl CalendarApi for GraphCalendarClient {
    fn name(&self) -> &str {
        "outlook"
    }

    fn list_events(&self) -> BoxFuture<'_, ProviderResult<Vec<RemoteEvent>>> {
        Box::pin(self.fetch_events())
    }

    fn create_event<'a>(&'a self, draft: &'a EventDraft) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.post_event(draft))
    }

    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        patch: &'a EventPatch,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.patch_event(event_id, patch))
    }
}

/// Converts a Graph event.
///
/// An event whose start or end is missing or unreadable is kept as
/// [`RemoteEvent::unreadable`] so its subject stays claimed.
fn convert_event(event: ApiEvent) -> RemoteEvent {
    let subject = event.subject.unwrap_or_default();
    let location = event
        .location
        .and_then(|l| l.display_name)
        .unwrap_or_default();

    let parse = |time: Option<&ApiDateTime>| -> Result<DateTime<Utc>, String> {
        let time = time.ok_or_else(|| "missing".to_string())?;
        parse_remote_timestamp(&time.date_time).map_err(|e| e.to_string())
    };
    match (parse(event.start.as_ref()), parse(event.end.as_ref())) {
        (Ok(start), Ok(end)) => RemoteEvent::new(event.id, subject, start, end, location),
        (Err(e), _) | (_, Err(e)) => {
            warn!(id = %event.id, subject = %subject, error = %e, "event has no readable start or end");
            RemoteEvent::unreadable(event.id, subject, location)
        }
    }
}

/// A calendar owned by the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub id: String,
    pub name: String,
}

trait NextLink {
    fn next_link(&self) -> Option<&str>;
}

/// Response from the events collection.
#[derive(Debug, Deserialize)]
struct EventListResponse {
    #[serde(default)]
    value: Vec<ApiEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

impl NextLink for EventListResponse {
    fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }
}

/// Response from the calendars collection.
#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    value: Vec<ApiCalendar>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

impl NextLink for CalendarListResponse {
    fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct ApiCalendar {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewCalendar<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    subject: Option<String>,
    start: Option<ApiDateTime>,
    end: Option<ApiDateTime>,
    location: Option<ApiLocation>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDateTime {
    date_time: String,
    #[serde(default)]
    time_zone: Option<String>,
}

impl ApiDateTime {
    fn utc(instant: DateTime<Utc>) -> Self {
        Self {
            date_time: format_timestamp(instant),
            time_zone: Some("UTC".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiLocation {
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiItemBody {
    content_type: &'static str,
    content: String,
}

/// POST body.
#[derive(Debug, Serialize)]
struct ApiNewEvent {
    subject: String,
    start: ApiDateTime,
    end: ApiDateTime,
    location: ApiLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<ApiItemBody>,
}

impl From<&EventDraft> for ApiNewEvent {
    fn from(draft: &EventDraft) -> Self {
        Self {
            subject: draft.subject.clone(),
            start: ApiDateTime::utc(draft.start),
            end: ApiDateTime::utc(draft.end),
            location: ApiLocation {
                display_name: Some(draft.location.clone()),
            },
            body: draft.notes.as_ref().map(|notes| ApiItemBody {
                content_type: "text",
                content: notes.clone(),
            }),
        }
    }
}

/// PATCH body; absent fields are left unchanged by Graph.
#[derive(Debug, Serialize)]
struct ApiEventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<ApiDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<ApiDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<ApiLocation>,
}

impl From<&EventPatch> for ApiEventUpdate {
    fn from(patch: &EventPatch) -> Self {
        Self {
            start: patch.start.map(ApiDateTime::utc),
            end: patch.end.map(ApiDateTime::utc),
            location: patch.location.as_ref().map(|name| ApiLocation {
                display_name: Some(name.clone()),
            }),
        }
    }
}
