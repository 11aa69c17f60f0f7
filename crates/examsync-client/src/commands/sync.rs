//! The `sync` command.

use std::sync::Arc;

use examsync_core::{Normalizer, RawExam};
use examsync_engine::{SyncOptions, SyncReport, run_sync};
use examsync_providers::CalendarApi;
use tracing::info;

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::input::load_exams;

/// Synchronize the exams read from `input` into the configured calendar.
///
/// Prints one line per exam and a summary. Fails when the run aborts or when
/// any exam ends up failed.
pub async fn run(config: &ClientConfig, input: &str, dry_run: bool) -> ClientResult<()> {
    let normalizer = config.sync.normalizer().map_err(ClientError::Config)?;
    let options = config.sync.sync_options(dry_run).map_err(ClientError::Config)?;
    let backend = Backend::from_config(config)?;

    let exams = load_exams(input).await?;

    let token = backend.credential_manager()?.access_token().await?;
    let calendar = backend.connect(token).await?;
    info!(
        backend = %backend.kind(),
        exams = exams.len(),
        dry_run,
        "starting sync"
    );

    let report = execute(calendar, &normalizer, &exams, &options).await?;
    println!("{}", report);
    finish(&report)
}

/// Runs the engine against any calendar backend.
pub async fn execute(
    api: Arc<dyn CalendarApi>,
    normalizer: &Normalizer,
    exams: &[RawExam],
    options: &SyncOptions,
) -> ClientResult<SyncReport> {
    Ok(run_sync(api, normalizer, exams, options).await?)
}

/// Maps the report onto the process outcome.
pub fn finish(report: &SyncReport) -> ClientResult<()> {
    match report.counts().failed {
        0 => Ok(()),
        failed => Err(ClientError::SyncFailed { failed }),
    }
}
