//! Per-exam outcomes of a sync run.

use std::fmt;
use std::time::Duration;

use examsync_core::SkipReason;

/// Terminal state of one exam. Every exam reaches exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamState {
    /// Normalization failed; no remote call was made.
    Skipped(SkipReason),
    /// The remote event already matches.
    Unchanged,
    /// A new remote event was created.
    Created,
    /// The remote event was patched; `fields` names what changed.
    Updated { fields: Vec<&'static str> },
    /// The exam could not be reconciled.
    Failed(String),
}

impl ExamState {
    /// Short label used in the report. Dry runs describe intent instead of outcome.
    pub fn label(&self, dry_run: bool) -> &'static str {
        match (self, dry_run) {
            (Self::Skipped(_), _) => "skipped",
            (Self::Unchanged, _) => "unchanged",
            (Self::Created, false) => "created",
            (Self::Created, true) => "would create",
            (Self::Updated { .. }, false) => "updated",
            (Self::Updated { .. }, true) => "would update",
            (Self::Failed(_), _) => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome of one exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamReport {
    /// Name as scraped.
    pub name: String,
    /// Normalized subject, when normalization succeeded.
    pub subject: Option<String>,
    pub state: ExamState,
}

impl ExamReport {
    /// Subject if known, otherwise the scraped name.
    pub fn display_name(&self) -> &str {
        self.subject.as_deref().unwrap_or(&self.name)
    }
}

/// Number of exams per terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of a whole run, in input order.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub exams: Vec<ExamReport>,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn counts(&self) -> StateCounts {
        self.exams
            .iter()
            .fold(StateCounts::default(), |mut counts, exam| {
                match exam.state {
                    ExamState::Created => counts.created += 1,
                    ExamState::Updated { .. } => counts.updated += 1,
                    ExamState::Unchanged => counts.unchanged += 1,
                    ExamState::Skipped(_) => counts.skipped += 1,
                    ExamState::Failed(_) => counts.failed += 1,
                }
                counts
            })
    }

    /// Returns true if any exam ended `Failed`.
    pub fn has_failures(&self) -> bool {
        self.exams.iter().any(|e| e.state.is_failure())
    }

    /// One-line summary of the counts.
    pub fn summary(&self) -> String {
        let c = self.counts();
        let (created, updated) = if self.dry_run {
            ("to create", "to update")
        } else {
            ("created", "updated")
        };
        format!(
            "{} {created}, {} {updated}, {} unchanged, {} skipped, {} failed",
            c.created, c.updated, c.unchanged, c.skipped, c.failed
        )
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for exam in &self.exams {
            write!(f, "{:<13}{}", exam.state.label(self.dry_run), exam.display_name())?;
            match &exam.state {
                ExamState::Updated { fields } => write!(f, " ({})", fields.join(", "))?,
                ExamState::Skipped(reason) => write!(f, ": {}", reason)?,
                ExamState::Failed(reason) => write!(f, ": {}", reason)?,
                ExamState::Created | ExamState::Unchanged => {}
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(dry_run: bool) -> SyncReport {
        let entry = |name: &str, subject: Option<&str>, state| ExamReport {
            name: name.to_string(),
            subject: subject.map(String::from),
            state,
        };
        SyncReport {
            exams: vec![
                entry(
                    "CS 173 (Sp25): Final Exam",
                    Some("CS 173: Final Exam"),
                    ExamState::Created,
                ),
                entry(
                    "MATH 241 (Sp25): Exam 2",
                    Some("MATH 241: Exam 2"),
                    ExamState::Updated {
                        fields: vec!["start", "end"],
                    },
                ),
                entry(
                    "PHYS 211 (Sp25): Exam 1",
                    Some("PHYS 211: Exam 1"),
                    ExamState::Unchanged,
                ),
                entry("ECE 220 (Sp25): Quiz", None, ExamState::Skipped(SkipReason::MissingDate)),
                entry(
                    "CHEM 102 (Sp25): Final",
                    Some("CHEM 102: Final"),
                    ExamState::Failed("bad_request: create event failed (HTTP 400)".to_string()),
                ),
            ],
            elapsed: Duration::from_millis(1200),
            dry_run,
        }
    }

    #[test]
    fn counts_and_failures() {
        let report = report(false);
        assert_eq!(
            report.counts(),
            StateCounts {
                created: 1,
                updated: 1,
                unchanged: 1,
                skipped: 1,
                failed: 1,
            }
        );
        assert!(report.has_failures());
        assert!(!SyncReport::default().has_failures());
    }

    #[test]
    fn render_report() {
        insta::assert_snapshot!(report(false).to_string(), @r"
        created      CS 173: Final Exam
        updated      MATH 241: Exam 2 (start, end)
        unchanged    PHYS 211: Exam 1
        skipped      ECE 220 (Sp25): Quiz: missing date
        failed       CHEM 102: Final: bad_request: create event failed (HTTP 400)
        1 created, 1 updated, 1 unchanged, 1 skipped, 1 failed
        ");
    }

    #[test]
    fn render_dry_run() {
        insta::assert_snapshot!(report(true).to_string(), @r"
        would create CS 173: Final Exam
        would update MATH 241: Exam 2 (start, end)
        unchanged    PHYS 211: Exam 1
        skipped      ECE 220 (Sp25): Quiz: missing date
        failed       CHEM 102: Final: bad_request: create event failed (HTTP 400)
        1 to create, 1 to update, 1 unchanged, 1 skipped, 1 failed
        ");
    }
}
