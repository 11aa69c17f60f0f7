//! Exam records before and after normalization.
//!
//! A [`RawExam`] is what the scraper hands us: four strings copied from the
//! schedule page. A [`NormalizedExam`] carries the canonical values that get
//! compared against the calendar.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ParseError;

/// Placeholder the scraper writes when it could not read a field.
pub const MISSING_FIELD_PLACEHOLDER: &str = "N/A";

/// One exam listing as scraped from the schedule page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExam {
    /// Display name, possibly with a term tag, e.g. `CS 173 (Sp25): Final Exam`.
    pub name: String,

    /// Date and time text, e.g. `Wed, Mar 26, 8pm (CDT)`.
    #[serde(
        rename = "date",
        default,
        deserialize_with = "deserialize_optional_field"
    )]
    pub date_text: Option<String>,

    /// Location text; only the first line is meaningful.
    #[serde(rename = "location", default)]
    pub location_text: String,

    /// Duration text, e.g. `1 h 50 min`.
    #[serde(rename = "duration", default)]
    pub duration_text: String,
}

impl RawExam {
    /// Creates a raw exam record.
    pub fn new(
        name: impl Into<String>,
        date_text: Option<String>,
        location_text: impl Into<String>,
        duration_text: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            date_text: date_text.and_then(present),
            location_text: location_text.into(),
            duration_text: duration_text.into(),
        }
    }
}

fn present(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == MISSING_FIELD_PLACEHOLDER {
        None
    } else {
        Some(value)
    }
}

fn deserialize_optional_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(present))
}

/// An exam with canonical calendar values.
///
/// Invariants: `end > start`, `subject` carries no parenthetical tag and
/// `location` is a single line without a source prefix tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedExam {
    /// Canonical subject, the join key against remote events.
    pub subject: String,
    /// Start instant in UTC.
    pub start: DateTime<Utc>,
    /// End instant in UTC.
    pub end: DateTime<Utc>,
    /// Single-line location.
    pub location: String,
}

/// Why an exam was left out of reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The scraper produced no date text.
    MissingDate,
    /// The date text could not be parsed.
    InvalidDate(ParseError),
    /// The duration text could not be parsed.
    InvalidDuration(ParseError),
    /// The duration parsed to zero, which would give an empty event.
    EmptyDuration,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDate => write!(f, "missing date"),
            Self::InvalidDate(err) => write!(f, "unparseable date: {}", err),
            Self::InvalidDuration(err) => write!(f, "unparseable duration: {}", err),
            Self::EmptyDuration => write!(f, "zero-length duration"),
        }
    }
}

/// Outcome of normalizing one raw exam.
pub type NormalizeOutcome = Result<NormalizedExam, SkipReason>;
