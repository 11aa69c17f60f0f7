//! Concurrent dispatch of per-exam reconciliation.
//!
//! Each exam is reconciled in its own tokio task; a semaphore bounds how
//! many run at once. The index is shared read-only, so tasks never
//! coordinate with one another.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use examsync_core::NormalizedExam;
use examsync_providers::{CalendarApi, ProviderError, ProviderResult};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::index::RemoteEventIndex;
use crate::reconcile::Reconciler;
use crate::report::ExamState;

/// Upper bound on the default worker count.
const MAX_DEFAULT_WORKERS: usize = 10;

/// Retry policy for a single create or update call.
///
/// [`run`](RetryPolicy::run) retries transient failures (HTTP 429 and 5xx).
/// Calls that must not be repeated after a partial success pick a narrower
/// condition with [`run_when`](RetryPolicy::run_when).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and default delays.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1)
    }

    /// Builder: set backoff parameters.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Delay after the given number of failed attempts.
    pub fn backoff_delay(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_backoff.as_secs_f64();
        let multiplier = self.backoff_multiplier.powi(failed_attempts as i32 - 1);
        let max = self.max_backoff.as_secs_f64();

        Duration::from_secs_f64((base * multiplier).min(max))
    }

    /// Runs `op` until it succeeds, fails permanently or the budget is spent.
    pub async fn run<T, F, Fut>(&self, what: &str, op: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        self.run_when(what, op, ProviderError::is_retryable).await
    }

    /// Like [`run`](Self::run), but retries only errors accepted by `retry_if`.
    pub async fn run_when<T, F, Fut>(
        &self,
        what: &str,
        mut op: F,
        retry_if: impl Fn(&ProviderError) -> bool,
    ) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retry_if(&e) && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        operation = %what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Bounded pool applying the reconciler to many exams.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    max_workers: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Self::default_workers())
    }
}

impl Dispatcher {
    /// Creates a dispatcher running at most `max_workers` exams at once.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// `min(10, 2 × available parallelism)`.
    pub fn default_workers() -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cpus * 2).min(MAX_DEFAULT_WORKERS)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Reconciles every exam and returns their states in input order.
    ///
    /// A task that panics leaves its exam `Failed`; the others are unaffected.
    pub async fn run(
        &self,
        reconciler: Arc<Reconciler>,
        api: Arc<dyn CalendarApi>,
        index: Arc<RemoteEventIndex>,
        exams: Vec<NormalizedExam>,
    ) -> Vec<ExamState> {
        let total = exams.len();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set = JoinSet::new();

        debug!(exams = total, workers = self.max_workers, "dispatching");

        for (idx, exam) in exams.into_iter().enumerate() {
            let reconciler = Arc::clone(&reconciler);
            let api = Arc::clone(&api);
            let index = Arc::clone(&index);
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let state = reconciler.reconcile(api.as_ref(), &index, &exam).await;
                (idx, state)
            });
        }

        let mut states: Vec<Option<ExamState>> = vec![None; total];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, state)) => states[idx] = Some(state),
                Err(e) => error!(error = %e, "reconcile task failed"),
            }
        }

        states
            .into_iter()
            .map(|state| {
                state.unwrap_or_else(|| ExamState::Failed("worker task panicked".to_string()))
            })
            .collect()
    }
}
