//! Loading the scraped exams.
//!
//! The scraper emits a JSON array of `{"name", "date", "location", "duration"}`
//! objects, written to a file or piped on stdin.

use std::path::Path;

use examsync_core::RawExam;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Input argument that selects stdin.
pub const STDIN: &str = "-";

/// Reads exams from `source`, a file path or `-`.
pub async fn load_exams(source: &str) -> ClientResult<Vec<RawExam>> {
    let text = if source == STDIN {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        let path = Path::new(source);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClientError::Input(format!("failed to read {}: {}", path.display(), e)))?
    };

    let origin = if source == STDIN { "stdin" } else { source };
    parse_exams(&text, origin)
}

/// Parses the scraper's JSON document.
pub fn parse_exams(text: &str, origin: &str) -> ClientResult<Vec<RawExam>> {
    let exams: Vec<RawExam> = serde_json::from_str(text)
        .map_err(|e| ClientError::Input(format!("{}: {}", origin, e)))?;
    debug!(count = exams.len(), %origin, "loaded exams");
    Ok(exams)
}
