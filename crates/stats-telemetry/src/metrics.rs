//! Prometheus metrics for the stats dispatcher.
//!
//! All metrics follow the naming convention: `stats_<component>_<metric>_<unit>`
//!
//! These describe the dispatcher itself (jobs, timers, listeners). The sampled
//! system metrics are never recorded here; they travel over the bus untouched.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SCHEDULER METRICS
    // =========================================================================

    /// Stats requests handed to the backend
    pub static ref REQUESTS_EMITTED: Counter = Counter::new(
        "stats_dispatcher_requests_emitted_total",
        "Total stats requests emitted to the backend"
    ).expect("metric creation failed");

    /// Jobs dispatched, by cadence
    pub static ref JOBS_DISPATCHED: CounterVec = CounterVec::new(
        Opts::new("stats_dispatcher_jobs_dispatched_total", "Jobs dispatched by cadence"),
        &["cadence"]  // cadence: standard/realtime
    ).expect("metric creation failed");

    /// Jobs currently installed, by cadence
    pub static ref JOBS_INSTALLED: GaugeVec = GaugeVec::new(
        Opts::new("stats_dispatcher_jobs_installed", "Jobs currently installed by cadence"),
        &["cadence"]
    ).expect("metric creation failed");

    /// Times a cadence timer was armed
    pub static ref TIMERS_ARMED: CounterVec = CounterVec::new(
        Opts::new("stats_dispatcher_timers_armed_total", "Cadence timers armed"),
        &["cadence"]
    ).expect("metric creation failed");

    // =========================================================================
    // LISTENER METRICS
    // =========================================================================

    /// Listeners currently registered across all sources
    pub static ref LISTENERS_ACTIVE: Gauge = Gauge::new(
        "stats_dispatcher_listeners_active",
        "Listeners currently registered across all sources"
    ).expect("metric creation failed");

    /// Listener registrations that produced no job
    pub static ref LISTENER_REJECTIONS: CounterVec = CounterVec::new(
        Opts::new("stats_dispatcher_listener_rejections_total", "Listener registrations rejected"),
        &["reason"]  // reason: source_not_found/key_unavailable
    ).expect("metric creation failed");

    // =========================================================================
    // AVAILABILITY METRICS
    // =========================================================================

    /// Feed announcements processed
    pub static ref AVAILABILITY_ANNOUNCEMENTS: Counter = Counter::new(
        "stats_dispatcher_announcements_total",
        "Feed announcements processed"
    ).expect("metric creation failed");

    /// Time spent rebuilding jobs after an announcement
    pub static ref REBUILD_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "stats_dispatcher_rebuild_duration_seconds",
            "Time spent rebuilding jobs after an announcement"
        ).buckets(exponential_buckets(0.00001, 2.0, 15).expect("bucket layout"))
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// The registry metrics were registered with.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry.
///
/// Registering again is a no-op, so tests and `init_telemetry` can both call it.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Scheduler
        Box::new(REQUESTS_EMITTED.clone()),
        Box::new(JOBS_DISPATCHED.clone()),
        Box::new(JOBS_INSTALLED.clone()),
        Box::new(TIMERS_ARMED.clone()),
        // Listeners
        Box::new(LISTENERS_ACTIVE.clone()),
        Box::new(LISTENER_REJECTIONS.clone()),
        // Availability
        Box::new(AVAILABILITY_ANNOUNCEMENTS.clone()),
        Box::new(REBUILD_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
