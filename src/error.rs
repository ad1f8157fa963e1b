//! Centralized error handling for pipesmith.
//!
//! Every public operation of the [`service`](crate::service) façade returns
//! [`Result`], so callers can match on the failure category instead of
//! parsing messages:
//!
//! ```
//! use pipesmith::error::PipesmithError;
//!
//! fn describe(err: &PipesmithError) -> &'static str {
//!     match err {
//!         PipesmithError::PipelineNotFound(_) => "no such pipeline",
//!         PipesmithError::UnsupportedSourceFormat(_) => "cannot read that file",
//!         _ => "something else went wrong",
//!     }
//! }
//! ```
//!
//! ## Context Extension Trait
//!
//! [`ResultExt`] adds `.context()` to any `Result` whose error converts into
//! [`PipesmithError`]. The original error is kept as the
//! [`source`](std::error::Error::source) of a [`PipesmithError::Context`]:
//!
//! ```no_run
//! use pipesmith::error::ResultExt as _;
//!
//! fn read_registry() -> pipesmith::error::Result<String> {
//!     std::fs::read_to_string("pipesmith_registry.json").context("Failed to read registry")
//! }
//! ```

use std::fmt;

/// Main error type for pipesmith operations.
#[derive(Debug)]
pub enum PipesmithError {
    /// I/O errors (registry file, artifacts, datasets)
    Io(std::io::Error),

    /// Polars failures while loading or profiling a dataset
    DataProcessing(String),

    /// JSON / YAML (de)serialization failures
    Serialization(String),

    /// Template rendering failures
    Template(String),

    /// Configuration errors
    Config(String),

    /// Dataset path whose extension is neither `.csv` nor `.json`
    UnsupportedSourceFormat(String),

    /// Framework name that has no descriptor
    UnsupportedFramework(String),

    /// Registry has no entry under this name
    PipelineNotFound(String),

    /// A single quality rule could not be evaluated
    QualityRuleExecution {
        rule: String,
        column: String,
        message: String,
    },

    /// An analysis stage produced no result
    AnalysisDegraded { stage: String, reason: String },

    /// The registry file exists but could not be parsed
    RegistryLoadCorrupted { path: String, message: String },

    /// An error annotated with what was being attempted
    Context {
        message: String,
        source: Box<PipesmithError>,
    },

    /// Anything else, already formatted
    Other(String),
}

impl fmt::Display for PipesmithError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            Self::Template(msg) => write!(f, "Template error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::UnsupportedSourceFormat(src) => {
                write!(f, "Unsupported data source format: {src}")
            }
            Self::UnsupportedFramework(name) => write!(f, "Unsupported framework: {name}"),
            Self::PipelineNotFound(name) => write!(f, "Pipeline '{name}' not found"),
            Self::QualityRuleExecution {
                rule,
                column,
                message,
            } => write!(f, "Error executing rule {rule} on '{column}': {message}"),
            Self::AnalysisDegraded { stage, reason } => {
                write!(f, "{stage} unavailable: {reason}")
            }
            Self::RegistryLoadCorrupted { path, message } => {
                write!(f, "Registry file {path} is corrupted: {message}")
            }
            Self::Context { message, source } => write!(f, "{message}: {source}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PipesmithError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipesmithError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for PipesmithError {
    fn from(err: anyhow::Error) -> Self {
        // Keep typed variants that travelled through an anyhow chain.
        match err.downcast::<Self>() {
            Ok(typed) => typed,
            Err(err) => Self::Other(format!("{err:#}")),
        }
    }
}

impl From<serde_json::Error> for PipesmithError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {err}"))
    }
}

impl From<serde_yaml::Error> for PipesmithError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(format!("YAML error: {err}"))
    }
}

impl From<polars::error::PolarsError> for PipesmithError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<minijinja::Error> for PipesmithError {
    fn from(err: minijinja::Error) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<PipesmithError> for String {
    fn from(err: PipesmithError) -> Self {
        err.to_string()
    }
}

/// Result type alias for pipesmith operations.
pub type Result<T> = std::result::Result<T, PipesmithError>;

impl PipesmithError {
    /// The innermost error beneath any [`Self::Context`] layers.
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// `.context()` / `.with_context()` for results convertible into
/// [`PipesmithError`].
pub trait ResultExt<T> {
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the message only on error.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PipesmithError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.with_context(|| msg.into())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PipesmithError::Context {
            message: f(),
            source: Box::new(e.into()),
        })
    }
}
