//! Error types for field normalization.

use thiserror::Error;

/// An error raised while parsing a scraped date or duration string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The date text does not follow `<weekday>, <month> <day>, <hour><am|pm>`.
    #[error("date format not recognized: {text:?}")]
    UnrecognizedDate { text: String },

    /// The month abbreviation is not one of `Jan`..`Dec`.
    #[error("invalid month abbreviation: {month:?}")]
    UnknownMonth { month: String },

    /// The day does not exist in the given month and year.
    #[error("invalid calendar date: {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    /// The hour or minute is out of range for a 12-hour clock.
    #[error("invalid time of day: {hour}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    /// The local wall-clock time falls into a DST gap in the source time zone.
    #[error("local time {local} does not exist in {timezone}")]
    NonexistentLocalTime { local: String, timezone: String },

    /// No `<int> h` or `<int> min` token was found.
    #[error("no duration found in {text:?}")]
    NoDurationTokens { text: String },

    /// The duration overflows or exceeds the longest accepted exam.
    #[error("duration out of range: {text:?}")]
    DurationOutOfRange { text: String },

    /// Adding the duration to the start leaves the representable time range.
    #[error("end time out of range for start {start}")]
    EndOutOfRange { start: String },

    /// A remote timestamp could not be parsed.
    #[error("invalid timestamp: {text:?}")]
    InvalidTimestamp { text: String },
}

impl ParseError {
    /// Creates an unrecognized date error.
    pub fn unrecognized_date(text: impl Into<String>) -> Self {
        Self::UnrecognizedDate { text: text.into() }
    }

    /// Creates an unknown month error.
    pub fn unknown_month(month: impl Into<String>) -> Self {
        Self::UnknownMonth {
            month: month.into(),
        }
    }
}

/// A specialized Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
