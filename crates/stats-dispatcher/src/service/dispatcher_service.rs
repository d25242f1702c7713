//! Stats Dispatcher Service
//!
//! Orchestrates the catalog, the availability resolver and the scheduler,
//! and hands every resulting request to the injected [`RequestSink`].

use async_trait::async_trait;
use stats_telemetry::metrics::{
    AVAILABILITY_ANNOUNCEMENTS, JOBS_DISPATCHED, JOBS_INSTALLED, LISTENERS_ACTIVE,
    LISTENER_REJECTIONS, REBUILD_DURATION, REQUESTS_EMITTED,
};
use stats_types::{FeedAnnouncement, OwnerId, StatsRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::domain::{
    AvailabilityResolver, Cadence, DispatcherConfig, Job, ListenerRegistration, Scheduler,
    SchedulerState, SourceRegistry, SourceSnapshot,
};
use crate::error::DispatchError;
use crate::ports::{DispatcherSnapshot, JobSummary, RequestSink, StatsDispatcherApi};

/// What a cadence's timer should currently look like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerPlan {
    /// Changes every time the lane is re-armed.
    pub epoch: u64,
    pub period: Duration,
}

/// Stats dispatcher implementation
///
/// Implements the `StatsDispatcherApi` port using an injected sink.
pub struct StatsDispatcherService<S: RequestSink> {
    registry: SourceRegistry,
    resolver: AvailabilityResolver,
    scheduler: Scheduler,
    config: DispatcherConfig,
    sink: Arc<S>,
}

impl<S: RequestSink> StatsDispatcherService<S> {
    /// Create a service over the default catalog and configuration.
    pub fn new(sink: Arc<S>) -> Self {
        Self::with_config(sink, DispatcherConfig::default())
    }

    /// Create with a custom configuration.
    pub fn with_config(sink: Arc<S>, config: DispatcherConfig) -> Self {
        Self::with_registry(sink, config, SourceRegistry::with_default_catalog())
    }

    /// Create with a custom configuration and catalog.
    pub fn with_registry(sink: Arc<S>, config: DispatcherConfig, registry: SourceRegistry) -> Self {
        Self {
            registry,
            resolver: AvailabilityResolver::new(),
            scheduler: Scheduler::new(config.message_builder()),
            config,
            sink,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Timer the adapter should run for `cadence`, or `None` if disarmed.
    pub fn timer(&self, cadence: Cadence) -> Option<TimerPlan> {
        self.scheduler.armed_epoch(cadence).map(|epoch| TimerPlan {
            epoch,
            period: self.config.interval(cadence),
        })
    }

    async fn emit_all(&self, messages: Vec<StatsRequest>) -> usize {
        let count = messages.len();
        for message in messages {
            trace!(event = %message.response_event, "Emitting stats request");
            self.sink.emit(message).await;
            REQUESTS_EMITTED.inc();
        }
        count
    }

    fn record_gauges(&self) {
        for cadence in Cadence::ALL {
            JOBS_INSTALLED
                .with_label_values(&[cadence.label()])
                .set(self.scheduler.jobs(cadence).len() as f64);
        }
        LISTENERS_ACTIVE.set(self.registry.listener_count() as f64);
    }

    fn summarize(jobs: &[Job]) -> Vec<JobSummary> {
        jobs.iter()
            .map(|job| JobSummary {
                id: job.id,
                source_name: job.source_name.clone(),
                response_events: job
                    .messages
                    .iter()
                    .map(|m| m.response_event.clone())
                    .collect(),
            })
            .collect()
    }
}

#[async_trait]
impl<S: RequestSink + 'static> StatsDispatcherApi for StatsDispatcherService<S> {
    async fn announce(&mut self, feeds: FeedAnnouncement) -> usize {
        AVAILABILITY_ANNOUNCEMENTS.inc();

        let messages = {
            let _timer = stats_telemetry::time_histogram!(REBUILD_DURATION);

            self.scheduler.stop(None);
            self.scheduler.clear();
            self.resolver.resolve_all(self.registry.iter_mut(), &feeds);

            for source in self.registry.iter_mut().filter(|s| s.has_listeners()) {
                self.scheduler.rebuild_source(source, None);
            }

            if self.scheduler.is_empty() {
                Vec::new()
            } else {
                self.scheduler.start()
            }
        };

        let installed: usize = Cadence::ALL
            .iter()
            .map(|&c| self.scheduler.jobs(c).len())
            .sum();
        info!(
            feeds = feeds.len(),
            installed,
            state = ?self.scheduler.state(),
            "Availability updated"
        );
        self.record_gauges();
        self.emit_all(messages).await;
        installed
    }

    async fn add_listener(
        &mut self,
        source_name: &str,
        owner: OwnerId,
        key: Option<String>,
    ) -> Result<(), DispatchError> {
        let Some(cadence) = self.registry.get(source_name).map(|s| s.cadence()) else {
            warn!(source = %source_name, %owner, "Listener for unknown source rejected");
            LISTENER_REJECTIONS
                .with_label_values(&["source_not_found"])
                .inc();
            return Err(DispatchError::SourceNotFound(source_name.to_string()));
        };

        if !self.scheduler.is_running() && !self.registry.has_listeners() {
            debug!("First listener, requesting availability");
            self.sink.request_sources().await;
        }

        let source = self
            .registry
            .get_mut(source_name)
            .ok_or_else(|| DispatchError::SourceNotFound(source_name.to_string()))?;
        let registration = ListenerRegistration::new(owner, source_name, key.clone());
        if !source.listeners.insert(registration) {
            debug!(source = %source_name, %owner, ?key, "Duplicate listener ignored");
            return Ok(());
        }

        let lane_was_empty = self.scheduler.jobs(cadence).is_empty();
        let outcome = self.scheduler.rebuild_source(source, None);
        let rejected = outcome.skipped.iter().any(|err| {
            matches!(err, DispatchError::KeyUnavailable { key: k, .. } if Some(k) == key.as_ref())
        });
        if rejected {
            LISTENER_REJECTIONS
                .with_label_values(&["key_unavailable"])
                .inc();
        }

        let messages = if self.scheduler.is_running() {
            if lane_was_empty && !self.scheduler.jobs(cadence).is_empty() {
                // Other lane kept the scheduler running; this one needs its timer
                self.scheduler.start_lane(cadence).unwrap_or_default()
            } else {
                Vec::new()
            }
        } else if !self.scheduler.is_empty() {
            // Availability was already known
            self.scheduler.start()
        } else {
            Vec::new()
        };

        info!(source = %source_name, %owner, ?key, job = ?outcome.job, "Listener added");
        self.record_gauges();
        self.emit_all(messages).await;
        Ok(())
    }

    async fn remove_listener(&mut self, owner: OwnerId) -> usize {
        let mut removed = 0;
        for source in self.registry.iter_mut() {
            if !source.listeners.contains_owner(owner) {
                continue;
            }
            let before = source.listeners.len();
            self.scheduler.rebuild_source(source, Some(owner));
            removed += before - source.listeners.len();
        }

        if removed == 0 {
            debug!(%owner, "No listeners to remove");
            return 0;
        }

        for cadence in Cadence::ALL {
            if self.scheduler.jobs(cadence).is_empty() && self.scheduler.is_armed(cadence) {
                self.scheduler.stop(Some(cadence));
            }
        }
        if self.scheduler.is_empty() {
            self.scheduler.stop(None);
        }

        info!(%owner, removed, state = ?self.scheduler.state(), "Listener removed");
        self.record_gauges();
        removed
    }

    async fn tick(&mut self, cadence: Cadence) -> usize {
        let Some(job) = self.scheduler.tick(cadence) else {
            return 0;
        };
        let messages = job.messages.clone();
        trace!(cadence = %cadence, job = %job.id, source = %job.source_name, "Tick");

        JOBS_DISPATCHED.with_label_values(&[cadence.label()]).inc();
        self.emit_all(messages).await
    }

    async fn request_sources(&self) {
        self.sink.request_sources().await;
    }

    fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    fn source(&self, name: &str) -> Option<SourceSnapshot> {
        self.registry.snapshot(name)
    }

    fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            state: self.scheduler.state(),
            standard_jobs: Self::summarize(self.scheduler.jobs(Cadence::Standard)),
            realtime_jobs: Self::summarize(self.scheduler.jobs(Cadence::Realtime)),
            standard_armed: self.scheduler.is_armed(Cadence::Standard),
            realtime_armed: self.scheduler.is_armed(Cadence::Realtime),
            listeners: self.registry.listener_count(),
        }
    }
}
