//! Raw scraped fields to canonical calendar values.
//!
//! Every function here is pure. The only context a conversion needs (source
//! time zone, location tags, today's date) is carried by [`Normalizer`], so
//! nothing reads global state.
//!
//! The pipeline for one exam:
//! 1. [`normalize_subject`] strips term tags such as `(Sp25)`
//! 2. [`normalize_location`] keeps the first line and drops the `CBTF:` tag
//! 3. [`resolve_relative_date`] turns `Today,`/`Tomorrow,` into a weekday form
//! 4. [`parse_start`] reads the wall-clock time in the source zone and converts to UTC
//! 5. [`parse_duration`] and [`derive_end`] compute the end instant

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::debug;

use crate::error::{ParseError, ParseResult};
use crate::exam::{NormalizeOutcome, NormalizedExam, RawExam, SkipReason};

/// Location prefix tag written by the testing-center listing.
pub const DEFAULT_LOCATION_TAG: &str = "CBTF:";

/// Time zone the schedule page renders its wall-clock times in.
pub const DEFAULT_SOURCE_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Longest exam duration accepted, in hours.
pub const MAX_DURATION_HOURS: i64 = 48;

/// Wire format for UTC timestamps sent to the calendar.
const UTC_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

static PARENTHETICAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").expect("Invalid parenthetical regex"));

/// `<weekday>, <month> <day>, <hour>[:<minute>]<am|pm> [(<zone>)]`
static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([a-z]{3})[a-z]*\.?,\s*([a-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b(?:\s*\(([a-z]{2,5})\))?",
    )
    .expect("Invalid date regex")
});

static RELATIVE_DAY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(today|tomorrow)\s*,").expect("Invalid relative regex"));

/// The unit must not run into another word, but may run into a number (`1h50min`).
static HOURS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*h(?:ours?|rs?)?(?:[^a-z]|$)").expect("Invalid hours regex")
});

static MINUTES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*min(?:ute)?s?\b").expect("Invalid minutes regex"));

/// Removes every parenthetical substring and surrounding whitespace.
///
/// `CS 173 (Sp25): Final Exam` becomes `CS 173: Final Exam`.
pub fn normalize_subject(raw: &str) -> String {
    PARENTHETICAL_REGEX.replace_all(raw, "").trim().to_string()
}

/// Keeps the first line of a location and strips the default prefix tag.
pub fn normalize_location(raw: &str) -> String {
    normalize_location_with(raw, &[DEFAULT_LOCATION_TAG])
}

/// Keeps the first line of a location and strips the first matching tag.
pub fn normalize_location_with<S: AsRef<str>>(raw: &str, tags: &[S]) -> String {
    let first_line = raw.lines().next().unwrap_or_default().trim();
    let stripped = tags
        .iter()
        .find_map(|tag| first_line.strip_prefix(tag.as_ref()))
        .unwrap_or(first_line);
    stripped.trim().to_string()
}

/// Rewrites a leading `Today,` or `Tomorrow,` into `<weekday>, <month> <day>,`.
///
/// `today` must be the current date in the source time zone. Text without a
/// relative day is returned unchanged.
pub fn resolve_relative_date(text: &str, today: NaiveDate) -> Cow<'_, str> {
    let Some(caps) = RELATIVE_DAY_REGEX.captures(text) else {
        return Cow::Borrowed(text);
    };

    let date = if caps[1].eq_ignore_ascii_case("tomorrow") {
        today.succ_opt().unwrap_or(today)
    } else {
        today
    };
    let prefix = date.format("%a, %b %-d,").to_string();
    Cow::Owned(RELATIVE_DAY_REGEX.replace(text, prefix.as_str()).into_owned())
}

/// Parses a schedule date such as `Wed, Mar 26, 8pm (CDT)` into a UTC instant.
///
/// The wall-clock time is interpreted in `source_tz` for `reference_year`.
/// The zone abbreviation in the text is informational only. There is no
/// rollover into the next year: a January exam listed in December gets the
/// December year.
pub fn parse_start(text: &str, reference_year: i32, source_tz: Tz) -> ParseResult<DateTime<Utc>> {
    let cleaned = text.replace('\u{a0}', " ");
    let caps = DATE_REGEX
        .captures(&cleaned)
        .ok_or_else(|| ParseError::unrecognized_date(text))?;

    let month_text = &caps[2];
    let month = month_number(month_text).ok_or_else(|| ParseError::unknown_month(month_text))?;
    // The regex restricts these captures to one or two digits.
    let day: u32 = caps[3].parse().unwrap_or_default();
    let hour12: u32 = caps[4].parse().unwrap_or_default();
    let minute: u32 = caps
        .get(5)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let is_pm = caps[6].eq_ignore_ascii_case("pm");

    if !(1..=12).contains(&hour12) || minute > 59 {
        return Err(ParseError::InvalidTime {
            hour: hour12,
            minute,
        });
    }
    let hour = match (hour12, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };

    let date = NaiveDate::from_ymd_opt(reference_year, month, day).ok_or(ParseError::InvalidDate {
        year: reference_year,
        month,
        day,
    })?;
    let local = date
        .and_hms_opt(hour, minute, 0)
        .ok_or(ParseError::InvalidTime { hour, minute })?;

    let zoned = source_tz
        .from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| ParseError::NonexistentLocalTime {
            local: local.to_string(),
            timezone: source_tz.name().to_string(),
        })?;

    Ok(zoned.with_timezone(&Utc))
}

fn month_number(text: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix = text.get(..3)?.to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| idx as u32 + 1)
}

/// Parses a duration such as `1 h 50 min`, `1h50min` or `50 min`.
///
/// Either token may be missing and then counts as zero, but text with
/// neither token is an error rather than a zero duration. Durations longer
/// than [`MAX_DURATION_HOURS`] are rejected.
pub fn parse_duration(text: &str) -> ParseResult<TimeDelta> {
    let cleaned = text.replace('\u{a0}', " ");
    let out_of_range = || ParseError::DurationOutOfRange {
        text: text.to_string(),
    };

    let hours = capture_number(&HOURS_REGEX, &cleaned);
    let minutes = capture_number(&MINUTES_REGEX, &cleaned);
    if hours.is_none() && minutes.is_none() {
        return Err(ParseError::NoDurationTokens {
            text: text.to_string(),
        });
    }

    let hours = TimeDelta::try_hours(hours.unwrap_or(Some(0)).ok_or_else(out_of_range)?)
        .ok_or_else(out_of_range)?;
    let minutes = TimeDelta::try_minutes(minutes.unwrap_or(Some(0)).ok_or_else(out_of_range)?)
        .ok_or_else(out_of_range)?;
    let total = hours.checked_add(&minutes).ok_or_else(out_of_range)?;
    if total > TimeDelta::hours(MAX_DURATION_HOURS) {
        return Err(out_of_range());
    }
    Ok(total)
}

/// Returns `None` when the token is absent and `Some(None)` when its number overflows.
fn capture_number(regex: &Regex, text: &str) -> Option<Option<i64>> {
    regex
        .captures(text)
        .map(|caps| caps[1].parse::<i64>().ok())
}

/// Computes the end instant of an exam.
///
/// Fails instead of overflowing when the end falls outside the representable range.
pub fn derive_end(start: DateTime<Utc>, duration: TimeDelta) -> ParseResult<DateTime<Utc>> {
    start
        .checked_add_signed(duration)
        .ok_or_else(|| ParseError::EndOutOfRange {
            start: format_timestamp(start),
        })
}

/// Strips sub-second precision and a trailing `Z` from a remote timestamp.
///
/// `2025-03-27T01:00:00.0000000Z` becomes `2025-03-27T01:00:00`.
pub fn normalize_timestamp(text: &str) -> &str {
    let trimmed = text.trim();
    let without_fraction = trimmed.split('.').next().unwrap_or(trimmed);
    without_fraction.trim_end_matches('Z')
}

/// Parses a timestamp reported by the calendar into a UTC instant.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_remote_timestamp(text: &str) -> ParseResult<DateTime<Utc>> {
    let invalid = || ParseError::InvalidTimestamp {
        text: text.to_string(),
    };

    if let Ok(naive) = NaiveDateTime::parse_from_str(normalize_timestamp(text), "%Y-%m-%dT%H:%M:%S")
    {
        return Ok(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .and_then(|dt| dt.with_timezone(&Utc).with_nanosecond(0))
        .ok_or_else(invalid)
}

/// Formats an instant the way the calendar expects it: `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format(UTC_TIMESTAMP_FORMAT).to_string()
}

/// Converts raw exams into normalized ones for a single run.
#[derive(Debug, Clone)]
pub struct Normalizer {
    source_timezone: Tz,
    location_tags: Vec<String>,
    today: NaiveDate,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_TIMEZONE)
    }
}

impl Normalizer {
    /// Creates a normalizer for the given source zone, dated today in that zone.
    pub fn new(source_timezone: Tz) -> Self {
        Self {
            source_timezone,
            location_tags: vec![DEFAULT_LOCATION_TAG.to_string()],
            today: Utc::now().with_timezone(&source_timezone).date_naive(),
        }
    }

    /// Builder: replace the location prefix tags.
    #[must_use]
    pub fn with_location_tags(mut self, tags: Vec<String>) -> Self {
        self.location_tags = tags;
        self
    }

    /// Builder: pin the reference date (used for `Today,` and the year).
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Returns the source time zone.
    pub fn source_timezone(&self) -> Tz {
        self.source_timezone
    }

    /// Returns the location prefix tags.
    pub fn location_tags(&self) -> &[String] {
        &self.location_tags
    }

    /// Normalizes one raw exam, or reports why it has to be skipped.
    pub fn normalize(&self, raw: &RawExam) -> NormalizeOutcome {
        let subject = normalize_subject(&raw.name);
        let location = normalize_location_with(&raw.location_text, self.location_tags.as_slice());

        let date_text = raw.date_text.as_deref().ok_or(SkipReason::MissingDate)?;
        let date_text = resolve_relative_date(date_text, self.today);
        let start = parse_start(&date_text, self.today.year(), self.source_timezone)
            .map_err(SkipReason::InvalidDate)?;

        let duration = parse_duration(&raw.duration_text).map_err(SkipReason::InvalidDuration)?;
        if duration <= TimeDelta::zero() {
            return Err(SkipReason::EmptyDuration);
        }
        let end = derive_end(start, duration).map_err(SkipReason::InvalidDuration)?;

        debug!(%subject, %start, %end, "normalized exam");
        Ok(NormalizedExam {
            subject,
            start,
            end,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn subject_strips_term_tag() {
        assert_eq!(
            normalize_subject("CS 173 (Sp25): Final Exam"),
            "CS 173: Final Exam"
        );
        assert_eq!(normalize_subject("  MATH 241 (Fa24) (retake) "), "MATH 241");
        assert_eq!(normalize_subject("No tag here"), "No tag here");
    }

    #[test]
    fn location_first_line_without_tag() {
        assert_eq!(
            normalize_location(
                "CBTF: Grainger Library 057\nRoom 057 in the basement of Grainger Library"
            ),
            "Grainger Library 057"
        );
        assert_eq!(normalize_location("  Siebel 1404  "), "Siebel 1404");
        assert_eq!(normalize_location(""), "");
    }

    #[test]
    fn location_custom_tags() {
        let tags = vec!["CBTF:".to_string(), "Testing Center:".to_string()];
        assert_eq!(
            normalize_location_with("Testing Center: DCL L416\nsecond line", tags.as_slice()),
            "DCL L416"
        );
    }

    #[test]
    fn parse_start_during_daylight_time() {
        let start = parse_start("Wed, Mar 26, 8pm (CDT)", 2025, DEFAULT_SOURCE_TIMEZONE).unwrap();
        assert_eq!(start, utc(2025, 3, 27, 1, 0));
    }

    #[test]
    fn parse_start_during_standard_time() {
        let start = parse_start("Tue, Feb 4, 9am (CST)", 2025, DEFAULT_SOURCE_TIMEZONE).unwrap();
        assert_eq!(start, utc(2025, 2, 4, 15, 0));
    }

    #[test]
    fn parse_start_twelve_hour_edges() {
        let midnight = parse_start("Thu, Apr 3, 12am (CDT)", 2025, DEFAULT_SOURCE_TIMEZONE).unwrap();
        assert_eq!(midnight, utc(2025, 4, 3, 5, 0));

        let noon = parse_start("Thu, Apr 3, 12pm (CDT)", 2025, DEFAULT_SOURCE_TIMEZONE).unwrap();
        assert_eq!(noon, utc(2025, 4, 3, 17, 0));
    }

    #[test]
    fn parse_start_with_minutes_and_nbsp() {
        let start =
            parse_start("Fri,\u{a0}May 2, 2:30pm", 2025, DEFAULT_SOURCE_TIMEZONE).unwrap();
        assert_eq!(start, utc(2025, 5, 2, 19, 30));
    }

    #[test]
    fn parse_start_rejects_bad_input() {
        assert!(matches!(
            parse_start("sometime next week", 2025, DEFAULT_SOURCE_TIMEZONE),
            Err(ParseError::UnrecognizedDate { .. })
        ));
        assert!(matches!(
            parse_start("Wed, Xyz 26, 8pm (CDT)", 2025, DEFAULT_SOURCE_TIMEZONE),
            Err(ParseError::UnknownMonth { .. })
        ));
        assert!(matches!(
            parse_start("Sun, Feb 30, 8pm (CST)", 2025, DEFAULT_SOURCE_TIMEZONE),
            Err(ParseError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse_start("Sun, Feb 3, 13pm (CST)", 2025, DEFAULT_SOURCE_TIMEZONE),
            Err(ParseError::InvalidTime { .. })
        ));
    }

    #[test]
    fn parse_start_in_dst_gap_fails() {
        // 2025-03-09 02:00 local does not exist in Chicago.
        assert!(matches!(
            parse_start("Sun, Mar 9, 2:30am (CST)", 2025, DEFAULT_SOURCE_TIMEZONE),
            Err(ParseError::NonexistentLocalTime { .. })
        ));
    }

    #[test]
    fn relative_dates_resolve_against_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 26).unwrap();
        assert_eq!(
            resolve_relative_date("Today, 8pm (CDT)", today),
            "Wed, Mar 26, 8pm (CDT)"
        );
        assert_eq!(
            resolve_relative_date("tomorrow, 9am (CDT)", today),
            "Thu, Mar 27, 9am (CDT)"
        );
        assert_eq!(
            resolve_relative_date("Fri, Mar 28, 9am (CDT)", today),
            "Fri, Mar 28, 9am (CDT)"
        );
    }

    #[test]
    fn duration_tokens() {
        assert_eq!(
            parse_duration("1 h 50 min").unwrap(),
            TimeDelta::minutes(110)
        );
        assert_eq!(parse_duration("50 min").unwrap(), TimeDelta::minutes(50));
        assert_eq!(parse_duration("2 h").unwrap(), TimeDelta::hours(2));
        assert_eq!(
            parse_duration("1\u{a0}h 20\u{a0}min, 2 attempts").unwrap(),
            TimeDelta::minutes(80)
        );
        assert!(matches!(
            parse_duration("garbage"),
            Err(ParseError::NoDurationTokens { .. })
        ));
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn end_is_start_plus_duration() {
        let start = utc(2025, 3, 27, 1, 0);
        assert_eq!(
            derive_end(start, TimeDelta::minutes(110)).unwrap(),
            utc(2025, 3, 27, 2, 50)
        );
        assert!(matches!(
            derive_end(DateTime::<Utc>::MAX_UTC, TimeDelta::minutes(1)),
            Err(ParseError::EndOutOfRange { .. })
        ));
    }

    #[test]
    fn compact_duration_tokens() {
        assert_eq!(parse_duration("1h50min").unwrap(), TimeDelta::minutes(110));
        assert_eq!(parse_duration("2h").unwrap(), TimeDelta::minutes(120));
        assert_eq!(parse_duration("1hr 5mins").unwrap(), TimeDelta::minutes(65));
        assert_eq!(parse_duration("3 hours").unwrap(), TimeDelta::hours(3));
        assert!(matches!(
            parse_duration("2 halves"),
            Err(ParseError::NoDurationTokens { .. })
        ));
    }

    #[test]
    fn oversized_durations_are_rejected() {
        for text in ["100000000000 h", "99999999999999999999 min", "49 h", "2881 min"] {
            assert!(
                matches!(
                    parse_duration(text),
                    Err(ParseError::DurationOutOfRange { .. })
                ),
                "{text}"
            );
        }
        assert_eq!(
            parse_duration("48 h").unwrap(),
            TimeDelta::hours(MAX_DURATION_HOURS)
        );
    }

    #[test]
    fn remote_timestamps_compare_equal_across_formats() {
        assert_eq!(
            normalize_timestamp("2025-03-27T01:00:00.0000000"),
            "2025-03-27T01:00:00"
        );
        assert_eq!(
            normalize_timestamp("2025-03-27T01:00:00Z"),
            "2025-03-27T01:00:00"
        );

        let expected = utc(2025, 3, 27, 1, 0);
        assert_eq!(
            parse_remote_timestamp("2025-03-27T01:00:00.0000000").unwrap(),
            expected
        );
        assert_eq!(
            parse_remote_timestamp("2025-03-27T01:00:00Z").unwrap(),
            expected
        );
        assert_eq!(
            parse_remote_timestamp("2025-03-26T20:00:00-05:00").unwrap(),
            expected
        );
        assert!(parse_remote_timestamp("yesterday").is_err());
    }

    #[test]
    fn format_timestamp_is_second_precision_utc() {
        assert_eq!(
            format_timestamp(utc(2025, 3, 27, 1, 0)),
            "2025-03-27T01:00:00Z"
        );
    }

    #[test]
    fn normalizer_builds_exam() {
        let normalizer = Normalizer::default().with_today(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        let raw = RawExam::new(
            "CS 173 (Sp25): Final Exam",
            Some("Wed, Mar 26, 8pm (CDT)".to_string()),
            "CBTF: Grainger Library 057\nRoom 057",
            "1 h 50 min",
        );

        let exam = normalizer.normalize(&raw).unwrap();
        assert_eq!(exam.subject, "CS 173: Final Exam");
        assert_eq!(exam.location, "Grainger Library 057");
        assert_eq!(exam.start, utc(2025, 3, 27, 1, 0));
        assert_eq!(exam.end, utc(2025, 3, 27, 2, 50));
    }

    #[test]
    fn normalizer_skips() {
        let normalizer = Normalizer::default().with_today(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        let missing = RawExam::new("A", None, "", "50 min");
        assert_eq!(normalizer.normalize(&missing), Err(SkipReason::MissingDate));

        let bad_date = RawExam::new("A", Some("soon".to_string()), "", "50 min");
        assert!(matches!(
            normalizer.normalize(&bad_date),
            Err(SkipReason::InvalidDate(_))
        ));

        let bad_duration = RawExam::new("A", Some("Wed, Mar 26, 8pm".to_string()), "", "long");
        assert!(matches!(
            normalizer.normalize(&bad_duration),
            Err(SkipReason::InvalidDuration(_))
        ));

        let zero = RawExam::new("A", Some("Wed, Mar 26, 8pm".to_string()), "", "0 min");
        assert_eq!(normalizer.normalize(&zero), Err(SkipReason::EmptyDuration));

        let huge = RawExam::new("A", Some("Wed, Mar 26, 8pm".to_string()), "", "100000000000 h");
        assert!(matches!(
            normalizer.normalize(&huge),
            Err(SkipReason::InvalidDuration(ParseError::DurationOutOfRange { .. }))
        ));
    }
}
