//! Exam-to-calendar reconciliation engine.
//!
//! A run normalizes the scraped exams, lists the remote calendar once into a
//! [`RemoteEventIndex`], then reconciles each exam concurrently: create when
//! missing, patch when start, end or location drifted, nothing otherwise.
//!
//! ```ignore
//! use std::sync::Arc;
//! use examsync_engine::{run_sync, SyncOptions};
//!
//! let report = run_sync(Arc::new(calendar), &normalizer, &exams, &SyncOptions::default()).await?;
//! println!("{report}");
//! ```

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod index;
pub mod reconcile;
pub mod report;

#[cfg(test)]
mod testing;

pub use dispatch::{Dispatcher, RetryPolicy};
pub use engine::{DEFAULT_EVENT_NOTES, SyncOptions, run_sync};
pub use error::{EngineError, EngineResult};
pub use index::{Lookup, RemoteEventIndex, fetch_index};
pub use reconcile::{Action, Reconciler, plan};
pub use report::{ExamReport, ExamState, StateCounts, SyncReport};
