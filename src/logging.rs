//! Logging setup for the pipesmith binary.
//!
//! Console output goes to stderr so stdout stays clean for command results.
//! Daily-rotated files are kept in the platform data directory:
//!
//! - `pipesmith.<date>.log`: everything that passes the env filter
//! - `error.<date>.log`: warnings and errors only
//!
//! The filter defaults to `info` and honours `RUST_LOG`.
//!
//! ```no_run
//! if pipesmith::logging::init().is_err() {
//!     pipesmith::logging::init_console()?;
//! }
//! tracing::info!("ready");
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const APP_DIR: &str = "pipesmith";
const RETAINED_FILES: usize = 10;

/// Platform log directory, created on first use.
///
/// - Linux: `~/.local/share/pipesmith/logs`
/// - macOS: `~/Library/Application Support/pipesmith/logs`
/// - Windows: `%APPDATA%/pipesmith/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let log_dir = dirs::data_dir()
        .context("No platform data directory")?
        .join(APP_DIR)
        .join("logs");

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    Ok(log_dir)
}

fn env_filter() -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new("info").context("Failed to build default log filter"),
    }
}

fn daily_appender(dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(RETAINED_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(dir)
        .with_context(|| format!("Failed to open {prefix} log in {}", dir.display()))
}

/// Plain-text file layer with source locations.
fn file_layer<S>(appender: RollingFileAppender) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_writer(appender)
}

/// Install stderr and rolling-file logging.
///
/// # Errors
///
/// Fails when the log directory or an appender cannot be created, or a
/// global subscriber is already set.
pub fn init() -> Result<()> {
    let log_dir = get_log_dir()?;
    let everything = daily_appender(&log_dir, APP_DIR)?;
    let problems = daily_appender(&log_dir, "error")?;

    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(file_layer(everything))
        .with(file_layer(problems).with_filter(EnvFilter::new("warn")))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Writing logs to {}", log_dir.display());
    Ok(())
}

/// stderr-only logging, for when the data directory is unusable.
pub fn init_console() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter()?)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")
}
