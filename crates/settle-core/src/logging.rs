//! Logging infrastructure for settle.
//!
//! Structured logging using the `tracing` ecosystem:
//!
//! - JSON lines written to `~/.settle/logs/settle.log` (rolled daily)
//! - Compact human-readable output on stderr
//! - `RUST_LOG` overrides the default filter
//!
//! ## Example
//!
//! ```no_run
//! use settle_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//!
//! tracing::info!("settle started");
//! tracing::debug!(stream = "input", files = 2, "reading batch");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{Result, SettleError};

/// Crate targets covered by the default filter.
const LOG_TARGETS: &[&str] = &["settle", "settle_core", "settle_cost", "settle_rates"];

/// Guard that must be held to ensure log flushing on shutdown.
///
/// Keep this guard alive for the lifetime of the application.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the settle logging system.
///
/// # Arguments
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.settle/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
///
/// # Returns
///
/// A [`LogGuard`] that must be held for the application lifetime to ensure
/// logs are properly flushed on shutdown.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| SettleError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "settle.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

    // JSON layer for file output
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    // Human-readable layer for console output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for testing.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Build the default filter directive string, e.g. `settle=info,settle_cost=info,...`.
pub fn default_directives(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Get the settle home directory.
///
/// Returns `~/.settle/`
pub fn settle_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| SettleError::Internal {
        message: "home directory could not be determined".into(),
    })?;

    Ok(home.join(".settle"))
}

/// Get the default log directory path.
///
/// Returns `~/.settle/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(settle_home()?.join("logs"))
}

/// Log a pipeline milestone for one upload batch.
///
/// # Example
///
/// ```ignore
/// log_batch_event!(stream = "input", event = "aggregated", records = 120);
/// ```
#[macro_export]
macro_rules! log_batch_event {
    ($($field:tt)*) => {
        tracing::info!(
            target: "settle::batch",
            $($field)*,
            "batch event"
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir() {
        // SAFETY: We are in a test context and this is the only test modifying HOME
        unsafe { std::env::set_var("HOME", "/tmp/test-home") };
        let dir = default_log_dir().unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/test-home/.settle/logs"));
    }

    #[test]
    fn test_default_directives_cover_all_crates() {
        let directives = default_directives("debug");
        assert_eq!(
            directives,
            "settle=debug,settle_core=debug,settle_cost=debug,settle_rates=debug"
        );
    }

    #[test]
    fn test_init_test_logging() {
        init_test_logging();
        log_batch_event!(stream = "input", event = "test");
    }
}
