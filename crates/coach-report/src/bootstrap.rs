use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive.
/// Falls back to `"info"` if the level string is not recognised.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    // Map Python log-level names to tracing level names (tracing uses lowercase).
    let upper = log_level.to_uppercase();
    let normalised = match upper.as_str() {
        "DEBUG" | "CRITICAL" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        "ERROR" => "error",
        other => other,
    };

    let filter = EnvFilter::try_new(normalised).unwrap_or_else(|_| EnvFilter::new("info"));

    // Diagnostics go to stderr so stdout stays clean JSON/NDJSON.
    let subscriber = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

// ── Data-directory discovery ───────────────────────────────────────────────────

/// Attempt to locate the snapshot data directory on the local system.
///
/// Checks the following paths in order and returns the first that exists:
/// 1. `./data/`
/// 2. `~/.coach/data/`
///
/// Returns `None` when neither path exists; explicit `--grades-path` /
/// `--school-path` options bypass discovery entirely.
pub fn discover_data_dir() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_data_dir_in(&cwd, dirs::home_dir())
}

fn discover_data_dir_in(cwd: &Path, home: Option<PathBuf>) -> Option<PathBuf> {
    let local = cwd.join("data");
    if local.is_dir() {
        return Some(local);
    }
    let candidate = home?.join(".coach").join("data");
    candidate.is_dir().then_some(candidate)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
