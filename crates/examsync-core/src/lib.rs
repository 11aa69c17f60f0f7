//! Core types: raw and normalized exams, field normalization, tracing.
//!
//! Everything in this crate is free of I/O apart from the tracing setup.

pub mod error;
pub mod exam;
pub mod normalize;
pub mod tracing;

pub use error::{ParseError, ParseResult};
pub use exam::{MISSING_FIELD_PLACEHOLDER, NormalizeOutcome, NormalizedExam, RawExam, SkipReason};
pub use normalize::{
    DEFAULT_LOCATION_TAG, DEFAULT_SOURCE_TIMEZONE, MAX_DURATION_HOURS, Normalizer, derive_end, format_timestamp,
    normalize_location, normalize_location_with, normalize_subject, normalize_timestamp,
    parse_duration, parse_remote_timestamp, parse_start, resolve_relative_date,
};
pub use tracing::{TracingConfig, TracingError, init_tracing};
