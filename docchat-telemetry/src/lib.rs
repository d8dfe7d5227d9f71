//! # docchat-telemetry
//!
//! Logging setup shared by the docchat binaries.
//!
//! Every crate in the workspace logs through [`tracing`] macros with
//! structured fields. This crate installs the global subscriber once, at
//! process start, with an [`EnvFilter`] read from `RUST_LOG` (falling back to
//! [`DEFAULT_FILTER`]) and either human-readable or JSON output.
//!
//! ```rust,no_run
//! use docchat_telemetry::{LogFormat, init_telemetry};
//!
//! init_telemetry("docchat", LogFormat::Text).expect("telemetry");
//! tracing::info!(port = 8000, "server starting");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive used when `RUST_LOG` is unset or empty.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line records.
    #[default]
    Text,
    /// One JSON object per record, event fields flattened.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

/// Errors raised while configuring logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// The rejected directive string.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The requested output format is not known.
    #[error("unknown log format '{0}' (expected 'text' or 'json')")]
    UnknownFormat(String),

    /// A global subscriber was installed before this call.
    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Parse a filter directive such as `info,docchat_rag=debug`.
pub fn parse_filter(spec: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(spec).map_err(|e| TelemetryError::InvalidFilter {
        filter: spec.to_string(),
        message: e.to_string(),
    })
}

/// Build the process filter from `RUST_LOG`, or `default_directive` when unset.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter, TelemetryError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(spec) if !spec.trim().is_empty() => parse_filter(&spec),
        _ => parse_filter(default_directive),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if `RUST_LOG` cannot be parsed and
/// [`TelemetryError::AlreadyInitialized`] if called twice in one process.
pub fn init_telemetry(service_name: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter = env_filter(DEFAULT_FILTER)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
        }
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .try_init(),
    };
    installed.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(service.name = service_name, log.format = %format, "telemetry initialized");
    Ok(())
}

/// Route logs to the test harness writer. Safe to call from every test.
pub fn init_for_tests() {
    let filter = env_filter("debug").unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}
