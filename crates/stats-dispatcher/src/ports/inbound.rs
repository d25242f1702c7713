//! Inbound Ports (Driving Ports)
//!
//! The API through which subscriptions, availability and timer ticks reach
//! the dispatcher. Every method mutates dispatcher state, so callers must
//! serialize them; the bus adapter does so by owning the service in one task.

use async_trait::async_trait;
use serde::Serialize;
use stats_types::{FeedAnnouncement, OwnerId};

use crate::domain::{Cadence, JobId, SchedulerState, SourceSnapshot};
use crate::error::DispatchError;

/// One installed job, without its messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub source_name: String,
    pub response_events: Vec<String>,
}

/// Point-in-time view of the whole dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatcherSnapshot {
    pub state: SchedulerState,
    pub standard_jobs: Vec<JobSummary>,
    pub realtime_jobs: Vec<JobSummary>,
    pub standard_armed: bool,
    pub realtime_armed: bool,
    pub listeners: usize,
}

impl DispatcherSnapshot {
    /// Jobs of one cadence.
    #[must_use]
    pub fn jobs(&self, cadence: Cadence) -> &[JobSummary] {
        match cadence {
            Cadence::Standard => &self.standard_jobs,
            Cadence::Realtime => &self.realtime_jobs,
        }
    }
}

/// Primary dispatcher API (Driving Port)
#[async_trait]
pub trait StatsDispatcherApi: Send {
    /// Apply a feed announcement: recompute availability, rebuild every
    /// source with listeners and restart the timers if anything is installed.
    ///
    /// Returns the number of installed jobs.
    async fn announce(&mut self, feeds: FeedAnnouncement) -> usize;

    /// Register interest in a source.
    ///
    /// # Errors
    ///
    /// `SourceNotFound` for a name missing from the catalog; nothing changes.
    async fn add_listener(
        &mut self,
        source_name: &str,
        owner: OwnerId,
        key: Option<String>,
    ) -> Result<(), DispatchError>;

    /// Drop every registration of `owner`. Returns how many were removed.
    async fn remove_listener(&mut self, owner: OwnerId) -> usize;

    /// Handle one timer firing. Returns the number of requests emitted.
    async fn tick(&mut self, cadence: Cadence) -> usize;

    /// Ask the backend for a fresh announcement.
    async fn request_sources(&self);

    /// Current lifecycle state.
    fn state(&self) -> SchedulerState;

    /// Runtime view of a source.
    fn source(&self, name: &str) -> Option<SourceSnapshot>;

    /// Runtime view of the job lists and timers.
    fn snapshot(&self) -> DispatcherSnapshot;
}
