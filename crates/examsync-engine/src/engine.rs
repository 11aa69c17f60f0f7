//! The sync run: normalize, index, reconcile, report.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use examsync_core::{NormalizeOutcome, Normalizer, RawExam};
use examsync_providers::CalendarApi;
use tracing::{info, warn};

use crate::dispatch::{Dispatcher, RetryPolicy};
use crate::error::{EngineError, EngineResult};
use crate::index::fetch_index;
use crate::reconcile::Reconciler;
use crate::report::{ExamReport, ExamState, SyncReport};

/// Note attached to created events unless configured otherwise.
pub const DEFAULT_EVENT_NOTES: &str = "Synced Automatically";

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Worker count; `None` uses [`Dispatcher::default_workers`].
    pub max_workers: Option<usize>,
    pub retry: RetryPolicy,
    /// Body of created events.
    pub event_notes: Option<String>,
    /// Plan without mutating the calendar.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_workers: None,
            retry: RetryPolicy::default(),
            event_notes: Some(DEFAULT_EVENT_NOTES.to_string()),
            dry_run: false,
        }
    }
}

impl SyncOptions {
    /// Builder: enable or disable dry run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Builder: set the worker count.
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Builder: set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builder: set the note attached to created events.
    #[must_use]
    pub fn with_event_notes(mut self, notes: Option<String>) -> Self {
        self.event_notes = notes;
        self
    }

    /// Rejects options no run can honor.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_workers == Some(0) {
            return Err(EngineError::config("max_workers must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(EngineError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }

    fn dispatcher(&self) -> Dispatcher {
        self.max_workers.map(Dispatcher::new).unwrap_or_default()
    }

    fn reconciler(&self, normalizer: &Normalizer) -> Reconciler {
        Reconciler::new(self.retry.clone())
            .with_notes(self.event_notes.clone())
            .with_location_tags(normalizer.location_tags().to_vec())
            .with_dry_run(self.dry_run)
    }
}

/// Synchronizes `exams` into the calendar behind `api`.
///
/// Every exam ends in exactly one [`ExamState`]; the report lists them in
/// input order. The remote calendar is listed once, and only if at least one
/// exam normalized.
///
/// # Errors
///
/// Fails when the options are invalid or the listing fails. Per-exam
/// failures are reported, not returned.
pub async fn run_sync(
    api: Arc<dyn CalendarApi>,
    normalizer: &Normalizer,
    exams: &[RawExam],
    options: &SyncOptions,
) -> EngineResult<SyncReport> {
    options.validate()?;
    let started = Instant::now();
    info!(exams = exams.len(), dry_run = options.dry_run, provider = api.name(), "starting sync");

    let outcomes: Vec<NormalizeOutcome> = exams.iter().map(|raw| normalizer.normalize(raw)).collect();

    let mut subject_counts: HashMap<&str, usize> = HashMap::new();
    for exam in outcomes.iter().flatten() {
        *subject_counts.entry(exam.subject.as_str()).or_default() += 1;
    }

    let mut states: Vec<Option<ExamState>> = Vec::with_capacity(exams.len());
    let mut pending = Vec::new();
    let mut pending_slots = Vec::new();
    for (idx, (raw, outcome)) in exams.iter().zip(&outcomes).enumerate() {
        match outcome {
            Err(reason) => {
                warn!(exam = %raw.name, %reason, "skipping exam");
                states.push(Some(ExamState::Skipped(reason.clone())));
            }
            Ok(exam) if subject_counts.get(exam.subject.as_str()).copied().unwrap_or(0) > 1 => {
                warn!(subject = %exam.subject, "duplicate exam subject in input");
                states.push(Some(ExamState::Failed("duplicate exam subject".to_string())));
            }
            Ok(exam) => {
                states.push(None);
                pending.push(exam.clone());
                pending_slots.push(idx);
            }
        }
    }

    if !pending.is_empty() {
        let index = fetch_index(api.as_ref()).await.map_err(EngineError::Listing)?;
        let results = options
            .dispatcher()
            .run(
                Arc::new(options.reconciler(normalizer)),
                Arc::clone(&api),
                Arc::new(index),
                pending,
            )
            .await;
        for (slot, state) in pending_slots.into_iter().zip(results) {
            states[slot] = Some(state);
        }
    }

    let reports = exams
        .iter()
        .zip(outcomes)
        .zip(states)
        .map(|((raw, outcome), state)| ExamReport {
            name: raw.name.clone(),
            subject: outcome.ok().map(|exam| exam.subject),
            state: state.unwrap_or_else(|| ExamState::Failed("not dispatched".to_string())),
        })
        .collect();

    let report = SyncReport {
        exams: reports,
        elapsed: started.elapsed(),
        dry_run: options.dry_run,
    };
    info!(summary = %report.summary(), elapsed_ms = report.elapsed.as_millis() as u64, "sync finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryCalendar, at, remote};
    use chrono::NaiveDate;
    use examsync_providers::ProviderError;

    /// 8pm CDT on Mar 26 2025 is `at(0)`; 9pm is `at(1)`.
    const EIGHT_PM: &str = "Wed, Mar 26, 8pm (CDT)";
    const NINE_PM: &str = "Wed, Mar 26, 9pm (CDT)";

    fn raw(name: &str, date: Option<&str>, location: &str) -> RawExam {
        RawExam::new(
            name,
            date.map(String::from),
            format!("CBTF: {location}\nRoom details"),
            "1 h",
        )
    }

    fn normalizer() -> Normalizer {
        Normalizer::default().with_today(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    fn options() -> SyncOptions {
        SyncOptions::default().with_max_workers(4)
    }

    async fn sync(calendar: &Arc<MemoryCalendar>, exams: &[RawExam]) -> SyncReport {
        run_sync(calendar.clone(), &normalizer(), exams, &options())
            .await
            .unwrap()
    }

    fn states(report: &SyncReport) -> Vec<ExamState> {
        report.exams.iter().map(|e| e.state.clone()).collect()
    }

    #[tokio::test]
    async fn creates_missing_events_with_notes() {
        let calendar = Arc::new(MemoryCalendar::default());
        let report = sync(
            &calendar,
            &[raw("CS 173 (Sp25): Final Exam", Some(EIGHT_PM), "Grainger Library 057")],
        )
        .await;

        assert_eq!(states(&report), vec![ExamState::Created]);
        assert_eq!(report.exams[0].subject.as_deref(), Some("CS 173: Final Exam"));

        let drafts = calendar.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].subject, "CS 173: Final Exam");
        assert_eq!(drafts[0].start, at(0));
        assert_eq!(drafts[0].end, at(1));
        assert_eq!(drafts[0].location, "Grainger Library 057");
        assert_eq!(drafts[0].notes.as_deref(), Some(DEFAULT_EVENT_NOTES));
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let calendar = Arc::new(MemoryCalendar::default());
        let exams = [
            raw("CS 173 (Sp25): Final Exam", Some(EIGHT_PM), "Grainger Library 057"),
            raw("MATH 241 (Sp25): Exam 2", Some(NINE_PM), "DCL L416"),
        ];

        let first = sync(&calendar, &exams).await;
        assert_eq!(first.counts().created, 2);
        let mutations = calendar.mutation_calls();

        let second = sync(&calendar, &exams).await;
        assert_eq!(states(&second), vec![ExamState::Unchanged, ExamState::Unchanged]);
        assert_eq!(calendar.mutation_calls(), mutations);
        assert!(!second.has_failures());
    }

    #[tokio::test]
    async fn update_issued_only_when_something_differs() {
        let calendar = Arc::new(MemoryCalendar::with_events(vec![
            remote("1", "CS 173 (Sp25): Final Exam", 0, "Grainger Library 057"),
            remote("2", "MATH 241 (Sp25): Exam 2", 0, "DCL L416"),
        ]));
        let exams = [
            raw("CS 173 (Sp25): Final Exam", Some(EIGHT_PM), "Grainger Library 057"),
            raw("MATH 241 (Sp25): Exam 2", Some(NINE_PM), "DCL L416"),
        ];

        let report = sync(&calendar, &exams).await;
        assert_eq!(
            states(&report),
            vec![
                ExamState::Unchanged,
                ExamState::Updated {
                    fields: vec!["start", "end"]
                }
            ]
        );
        assert_eq!(calendar.update_calls(), 1);
        assert_eq!(calendar.create_calls(), 0);
    }

    #[tokio::test]
    async fn one_failing_create_does_not_affect_others() {
        let calendar = Arc::new(MemoryCalendar::default());
        calendar.fail_create("MATH 241: Exam 2", 400, 1);
        let exams = [
            raw("CS 173 (Sp25): Final Exam", Some(EIGHT_PM), "Grainger"),
            raw("MATH 241 (Sp25): Exam 2", Some(NINE_PM), "DCL"),
            raw("PHYS 211 (Sp25): Exam 1", Some(NINE_PM), "Loomis"),
        ];

        let report = sync(&calendar, &exams).await;
        assert_eq!(report.exams[0].state, ExamState::Created);
        assert!(matches!(&report.exams[1].state, ExamState::Failed(r) if r.contains("HTTP 400")));
        assert_eq!(report.exams[2].state, ExamState::Created);
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn missing_date_is_skipped_without_remote_calls() {
        let calendar = Arc::new(MemoryCalendar::default());
        let report = sync(&calendar, &[raw("ECE 220 (Sp25): Quiz", None, "DCL")]).await;

        assert_eq!(
            states(&report),
            vec![ExamState::Skipped(examsync_core::SkipReason::MissingDate)]
        );
        assert!(report.exams[0].subject.is_none());
        assert_eq!(calendar.list_calls(), 0);
        assert_eq!(calendar.mutation_calls(), 0);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn unparseable_fields_are_skipped() {
        let calendar = Arc::new(MemoryCalendar::default());
        let mut bad_duration = raw("B", Some(EIGHT_PM), "x");
        bad_duration.duration_text = "soon".to_string();
        let exams = [raw("A", Some("someday"), "x"), bad_duration];

        let report = sync(&calendar, &exams).await;
        assert!(matches!(
            report.exams[0].state,
            ExamState::Skipped(examsync_core::SkipReason::InvalidDate(_))
        ));
        assert!(matches!(
            report.exams[1].state,
            ExamState::Skipped(examsync_core::SkipReason::InvalidDuration(_))
        ));
        assert_eq!(calendar.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn oversized_duration_is_skipped_and_the_run_continues() {
        let calendar = Arc::new(MemoryCalendar::default());
        let mut huge = raw("A", Some(EIGHT_PM), "x");
        huge.duration_text = "100000000000 h".to_string();
        let exams = [huge, raw("B", Some(NINE_PM), "x")];

        let report = sync(&calendar, &exams).await;
        assert!(matches!(
            report.exams[0].state,
            ExamState::Skipped(examsync_core::SkipReason::InvalidDuration(_))
        ));
        assert_eq!(report.exams[1].state, ExamState::Created);
    }

    #[tokio::test]
    async fn tagged_remote_location_is_unchanged() {
        let calendar = Arc::new(MemoryCalendar::with_events(vec![remote(
            "1",
            "CS 173 (Sp25): Final Exam",
            0,
            "CBTF: Grainger Library 057\nRoom 057 in the basement",
        )]));
        let report = sync(
            &calendar,
            &[raw("CS 173 (Sp25): Final Exam", Some(EIGHT_PM), "Grainger Library 057")],
        )
        .await;

        assert_eq!(states(&report), vec![ExamState::Unchanged]);
        assert_eq!(calendar.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_remote_subject_fails_without_calls() {
        let calendar = Arc::new(MemoryCalendar::with_events(vec![
            remote("1", "CS 173 (Sp25): Final Exam", 0, "Grainger"),
            remote("2", "CS 173 (Fa24): Final Exam", 5, "Grainger"),
        ]));
        let report = sync(&calendar, &[raw("CS 173 (Sp25): Final Exam", Some(NINE_PM), "x")]).await;

        assert!(matches!(
            &report.exams[0].state,
            ExamState::Failed(r) if r.contains("duplicate remote subject")
        ));
        assert_eq!(calendar.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_exam_subjects_both_fail() {
        let calendar = Arc::new(MemoryCalendar::default());
        let exams = [
            raw("CS 173 (Sp25): Final Exam", Some(EIGHT_PM), "Grainger"),
            raw("CS 173 (Fa24): Final Exam", Some(NINE_PM), "DCL"),
            raw("MATH 241 (Sp25): Exam 2", Some(NINE_PM), "DCL"),
        ];

        let report = sync(&calendar, &exams).await;
        let failed = ExamState::Failed("duplicate exam subject".to_string());
        assert_eq!(
            states(&report),
            vec![failed.clone(), failed, ExamState::Created]
        );
        assert_eq!(calendar.create_calls(), 1);
    }

    #[tokio::test]
    async fn listing_failure_aborts_the_run() {
        let calendar = Arc::new(MemoryCalendar::default());
        calendar.fail_listing(ProviderError::from_response(401, "expired", "listing failed"));

        let result = run_sync(
            calendar.clone(),
            &normalizer(),
            &[raw("A", Some(EIGHT_PM), "x")],
            &options(),
        )
        .await;
        assert!(matches!(result, Err(EngineError::Listing(ref e)) if e.status() == Some(401)));
        assert_eq!(calendar.mutation_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_create_failures_are_retried() {
        let calendar = Arc::new(MemoryCalendar::default());
        calendar.fail_create("A", 503, 2);
        calendar.fail_create("B", 503, 3);
        let exams = [raw("A", Some(EIGHT_PM), "x"), raw("B", Some(NINE_PM), "x")];

        let report = sync(&calendar, &exams).await;
        assert_eq!(report.exams[0].state, ExamState::Created);
        assert!(matches!(&report.exams[1].state, ExamState::Failed(r) if r.contains("HTTP 503")));
        assert_eq!(calendar.create_calls(), 6);
    }

    #[tokio::test]
    async fn dry_run_plans_without_mutating() {
        let calendar = Arc::new(MemoryCalendar::with_events(vec![remote(
            "1",
            "CS 173 (Sp25): Final Exam",
            0,
            "Old Room",
        )]));
        let exams = [
            raw("CS 173 (Sp25): Final Exam", Some(EIGHT_PM), "Grainger"),
            raw("MATH 241 (Sp25): Exam 2", Some(NINE_PM), "DCL"),
        ];

        let report = run_sync(
            calendar.clone(),
            &normalizer(),
            &exams,
            &options().with_dry_run(true),
        )
        .await
        .unwrap();

        assert!(report.dry_run);
        assert_eq!(
            states(&report),
            vec![
                ExamState::Updated {
                    fields: vec!["location"]
                },
                ExamState::Created
            ]
        );
        assert_eq!(calendar.list_calls(), 1);
        assert_eq!(calendar.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn every_exam_reaches_exactly_one_state() {
        let calendar = Arc::new(MemoryCalendar::with_events(vec![remote("1", "E", 0, "x")]));
        calendar.fail_create("D", 400, 1);
        let exams: Vec<RawExam> = vec![
            raw("A", None, "x"),
            raw("B", Some(EIGHT_PM), "x"),
            raw("B (dup)", Some(EIGHT_PM), "x"),
            raw("D", Some(EIGHT_PM), "x"),
            raw("E", Some(EIGHT_PM), "x"),
            raw("F", Some(NINE_PM), "x"),
        ];

        let report = sync(&calendar, &exams).await;
        assert_eq!(report.exams.len(), exams.len());
        let counts = report.counts();
        assert_eq!(
            counts.created + counts.updated + counts.unchanged + counts.skipped + counts.failed,
            exams.len()
        );
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.failed, 3);
        assert_eq!(counts.unchanged, 1);
        assert_eq!(counts.created, 1);
    }

    #[tokio::test]
    async fn invalid_options_abort_before_listing() {
        let calendar = Arc::new(MemoryCalendar::default());
        let mut options = options();
        options.max_workers = Some(0);

        let err = run_sync(
            calendar.clone(),
            &normalizer(),
            &[raw("A", Some(EIGHT_PM), "x")],
            &options,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
        assert_eq!(calendar.list_calls(), 0);
    }
}
