//! # Stats Telemetry
//!
//! Logging and metrics for the stats dispatcher.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` registry with an env filter and either
//!   pretty or JSON output
//! - **Metrics**: Prometheus counters and gauges describing what the
//!   dispatcher is doing (never the sampled metric values themselves)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stats_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `stats-dispatcher` | Service name in log lines |
//! | `STATS_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honored) |
//! | `STATS_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `STATS_JSON_LOGS` | `false` (true in containers) | JSON formatted logs |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{init_logging, LoggingGuard};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, AVAILABILITY_ANNOUNCEMENTS,
    JOBS_DISPATCHED, JOBS_INSTALLED, LISTENERS_ACTIVE, LISTENER_REJECTIONS, REBUILD_DURATION,
    REQUESTS_EMITTED, TIMERS_ARMED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Configuration could not be used.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first: registration is synchronous and cannot log yet
    let metrics_handle = register_metrics()?;

    let logging_guard = init_logging(&config)?;

    Ok(TelemetryGuard {
        _logging: logging_guard,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logging: LoggingGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for creating a span tagged with a metric source.
///
/// # Example
///
/// ```rust,ignore
/// let _span = stats_telemetry::source_span!("rebuild", "Cpu").entered();
/// ```
#[macro_export]
macro_rules! source_span {
    ($name:expr, $source:expr) => {
        tracing::debug_span!($name, source = %$source)
    };
}
