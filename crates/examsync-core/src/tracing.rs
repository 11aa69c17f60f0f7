//! Log setup for the `examsync` binary.
//!
//! Logs go to stderr so stdout stays free for the sync report.
//!
//! ```ignore
//! use examsync_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli(debug))?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How much the CLI logs and how each line looks.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level of the `examsync` crates when RUST_LOG is unset.
    pub level: Level,
    /// Source location and module path on every line.
    pub verbose: bool,
    /// Directive used instead of RUST_LOG.
    pub env_filter: Option<String>,
}

impl TracingConfig {
    /// Warnings only; `debug` switches to debug level with source locations
    /// and drops timestamps.
    #[must_use]
    pub fn cli(debug: bool) -> Self {
        Self {
            level: if debug { Level::DEBUG } else { Level::WARN },
            verbose: debug,
            env_filter: None,
        }
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(ref filter) = self.env_filter {
            return Ok(EnvFilter::try_new(filter)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("examsync={}", self.level))))
    }
}

/// Installs the global subscriber. Call once at process start.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.build_filter()?;
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_file(config.verbose)
        .with_line_number(config.verbose)
        .with_target(config.verbose);
    let layer = if config.verbose {
        layer.without_time().boxed()
    } else {
        layer.boxed()
    };

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(filter).with(layer))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_presets() {
        let quiet = TracingConfig::cli(false);
        assert_eq!(quiet.level, Level::WARN);
        assert!(!quiet.verbose);

        let debug = TracingConfig::cli(true);
        assert_eq!(debug.level, Level::DEBUG);
        assert!(debug.verbose);
        assert!(debug.env_filter.is_none());
    }

    #[test]
    fn explicit_filter_is_parsed() {
        let config = TracingConfig::cli(false).with_env_filter("examsync=trace");
        assert!(config.build_filter().is_ok());

        let config = TracingConfig::cli(false).with_env_filter("examsync=notalevel");
        assert!(matches!(config.build_filter(), Err(TracingError::EnvFilter(_))));
    }
}
