//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,bondfeed=debug";

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// `Json` when `RUST_ENV=production`, `Pretty` otherwise.
    pub fn from_env() -> Self {
        Self::from_rust_env(std::env::var("RUST_ENV").ok().as_deref())
    }

    fn from_rust_env(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initialize logging with the format picked from `RUST_ENV`.
pub fn init_logging() -> TelemetryResult<()> {
    init_logging_with(LogFormat::from_env(), None)
}

/// Initialize logging with an explicit format and optional fallback filter.
///
/// `RUST_LOG` still wins over `default_filter` when set. Fails if a global
/// subscriber is already installed.
pub fn init_logging_with(format: LogFormat, default_filter: Option<&str>) -> TelemetryResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(default_filter.unwrap_or(DEFAULT_FILTER))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true).with_thread_names(true))
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn build_filter(directives: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| TelemetryError::InvalidFilter {
        filter: directives.to_string(),
        reason: e.to_string(),
    })
}
