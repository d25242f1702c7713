//! Job scheduling
//!
//! Two independent lanes, one per [`Cadence`], each holding at most one job
//! per source. The scheduler never touches a clock: it tracks whether a lane
//! is armed and hands out jobs on [`Scheduler::tick`]; the bus adapter owns
//! the actual intervals and re-creates them whenever a lane's arm epoch
//! changes.
//!
//! ## Round robin
//!
//! Each armed lane keeps a 1-based cursor, reset to 1 when armed. A tick
//! advances the cursor (wrapping from `len` back to 1) and dispatches
//! `jobs[cursor - 1]`. The cursor is clamped whenever the lane shrinks, so
//! it never points past the end.

use serde::Serialize;
use stats_types::{OwnerId, StatsRequest};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use super::listeners::ListenerRegistration;
use super::message::MessageBuilder;
use super::source::{Cadence, MetricSource};
use crate::error::DispatchError;

/// Identity of a built job, unique for the scheduler's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Messages for one source, dispatched together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub source_name: String,
    pub cadence: Cadence,
    pub messages: Vec<StatsRequest>,
}

/// Result of rebuilding one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rebuild {
    /// Newly installed job, `None` when the source has nothing to request.
    pub job: Option<JobId>,
    /// Listeners skipped because their key is not currently offered.
    pub skipped: Vec<DispatchError>,
}

/// Lifecycle of the timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    NotStarted,
    Running,
}

#[derive(Debug, Default)]
struct Lane {
    jobs: Vec<Job>,
    cursor: usize,
    /// `Some(epoch)` while armed.
    armed: Option<u64>,
}

impl Lane {
    /// Remove the jobs in `ids`, returning the slot the first one held.
    fn remove_jobs(&mut self, ids: &[JobId]) -> Option<usize> {
        let slot = self.jobs.iter().position(|job| ids.contains(&job.id));
        self.jobs.retain(|job| !ids.contains(&job.id));
        self.cursor = self.cursor.min(self.jobs.len().max(1));
        slot
    }

    /// Insert at `slot`, or append when the source had no job.
    fn install(&mut self, job: Job, slot: Option<usize>) {
        let at = slot.map_or(self.jobs.len(), |slot| slot.min(self.jobs.len()));
        self.jobs.insert(at, job);
    }

    fn advance(&mut self) -> Option<&Job> {
        if self.jobs.is_empty() {
            return None;
        }
        if self.cursor < self.jobs.len() {
            self.cursor += 1;
        } else {
            self.cursor = 1;
        }
        self.jobs.get(self.cursor - 1)
    }
}

/// Owns both job lanes and their armed state.
#[derive(Debug)]
pub struct Scheduler {
    standard: Lane,
    realtime: Lane,
    state: SchedulerState,
    builder: MessageBuilder,
    next_job: u64,
    next_epoch: u64,
}

impl Scheduler {
    pub fn new(builder: MessageBuilder) -> Self {
        Self {
            standard: Lane::default(),
            realtime: Lane::default(),
            state: SchedulerState::NotStarted,
            builder,
            next_job: 1,
            next_epoch: 1,
        }
    }

    fn lane(&self, cadence: Cadence) -> &Lane {
        match cadence {
            Cadence::Standard => &self.standard,
            Cadence::Realtime => &self.realtime,
        }
    }

    fn lane_mut(&mut self, cadence: Cadence) -> &mut Lane {
        match cadence {
            Cadence::Standard => &mut self.standard,
            Cadence::Realtime => &mut self.realtime,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Jobs installed on a lane. A rebuilt job keeps its source's slot.
    pub fn jobs(&self, cadence: Cadence) -> &[Job] {
        &self.lane(cadence).jobs
    }

    pub fn is_empty(&self) -> bool {
        self.standard.jobs.is_empty() && self.realtime.jobs.is_empty()
    }

    pub fn is_armed(&self, cadence: Cadence) -> bool {
        self.lane(cadence).armed.is_some()
    }

    /// Epoch of the lane's current arming, `None` while disarmed.
    ///
    /// A new epoch means the lane was re-armed and its interval must restart.
    pub fn armed_epoch(&self, cadence: Cadence) -> Option<u64> {
        self.lane(cadence).armed
    }

    /// Rebuild the job of `source`, optionally removing `removed`'s
    /// registrations first.
    ///
    /// Listeners whose named key is not offered are kept but skipped; they
    /// are reported in [`Rebuild::skipped`].
    pub fn rebuild_source(
        &mut self,
        source: &mut MetricSource,
        removed: Option<OwnerId>,
    ) -> Rebuild {
        let _span = stats_telemetry::source_span!("rebuild_source", source.name()).entered();
        let cadence = source.cadence();

        // Prior job is found through the registrations, including the ones
        // about to be removed. Its slot is reused so lane order survives.
        let prior = source.listeners.cached_jobs();
        let slot = if prior.is_empty() {
            None
        } else {
            let slot = self.lane_mut(cadence).remove_jobs(&prior);
            debug!(source = %source.name(), ?slot, "Pruned prior job");
            slot
        };
        source.listeners.clear_jobs();

        if let Some(owner) = removed {
            source.listeners.remove_owner(owner);
        }
        let mut outcome = Rebuild::default();
        if source.listeners.is_empty() {
            return outcome;
        }

        let current_keys = source.current_keys();
        let mut seen = HashSet::new();
        let mut messages = Vec::new();
        let mut contributors = Vec::new();

        for (index, listener) in source.listeners.iter().enumerate() {
            let keys = match self.listener_keys(listener, source, &current_keys) {
                Ok(keys) => keys,
                Err(err) => {
                    debug!(source = %source.name(), owner = %listener.owner, %err, "Skipping listener");
                    outcome.skipped.push(err);
                    continue;
                }
            };

            for key in keys {
                if !seen.insert(key.clone()) {
                    continue;
                }
                match self.builder.build(&key, source) {
                    Ok(message) if message.items().is_empty() => {
                        debug!(source = %source.name(), %key, "No data items, message skipped");
                    }
                    Ok(message) => messages.push(message),
                    Err(err) => warn!(source = %source.name(), %key, %err, "Message not built"),
                }
            }
            contributors.push(index);
        }

        if messages.is_empty() {
            debug!(source = %source.name(), "Nothing to request, no job installed");
            return outcome;
        }

        let id = JobId(self.next_job);
        self.next_job += 1;

        for (index, listener) in source.listeners.iter_mut().enumerate() {
            if contributors.contains(&index) {
                listener.job = Some(id);
            }
        }

        debug!(
            source = %source.name(),
            job = %id,
            cadence = %cadence,
            messages = messages.len(),
            "Installed job"
        );
        self.lane_mut(cadence).install(
            Job {
                id,
                source_name: source.name().to_string(),
                cadence,
                messages,
            },
            slot,
        );
        outcome.job = Some(id);
        outcome
    }

    fn listener_keys(
        &self,
        listener: &ListenerRegistration,
        source: &MetricSource,
        current_keys: &[String],
    ) -> Result<Vec<String>, DispatchError> {
        match &listener.key {
            None => Ok(source.all_keys()),
            Some(key) if current_keys.iter().any(|k| k == key) => Ok(vec![source.named_key(key)]),
            Some(key) => Err(DispatchError::KeyUnavailable {
                source_name: source.name().to_string(),
                key: key.clone(),
            }),
        }
    }

    /// Dispatch every installed job once, then arm each non-empty lane.
    ///
    /// Empty lanes are refused with a warning and stay disarmed. Returns the
    /// messages to emit, standard lane first.
    pub fn start(&mut self) -> Vec<StatsRequest> {
        let mut out = Vec::new();
        for cadence in Cadence::ALL {
            match self.start_lane(cadence) {
                Ok(messages) => out.extend(messages),
                Err(err) => warn!(%err, "Timer only runs when its job list is not empty"),
            }
        }
        out
    }

    /// Dispatch one lane's jobs once and arm it.
    ///
    /// An already-armed lane keeps its timer; its jobs are still returned.
    pub fn start_lane(&mut self, cadence: Cadence) -> Result<Vec<StatsRequest>, DispatchError> {
        let epoch = self.next_epoch;
        let lane = self.lane_mut(cadence);
        if lane.jobs.is_empty() {
            return Err(DispatchError::EmptyJobList(cadence));
        }

        let messages: Vec<StatsRequest> = lane
            .jobs
            .iter()
            .flat_map(|job| job.messages.iter().cloned())
            .collect();

        if lane.armed.is_none() {
            lane.armed = Some(epoch);
            lane.cursor = 1;
            self.next_epoch += 1;
            info!(cadence = %cadence, epoch, "Timer armed");
        }

        if self.state == SchedulerState::NotStarted {
            info!("Scheduler running");
        }
        self.state = SchedulerState::Running;
        Ok(messages)
    }

    /// Disarm one lane, or both with `None`.
    ///
    /// The scheduler returns to `NotStarted` once no lane is armed.
    pub fn stop(&mut self, cadence: Option<Cadence>) {
        let targets: &[Cadence] = match cadence {
            Some(Cadence::Standard) => &[Cadence::Standard],
            Some(Cadence::Realtime) => &[Cadence::Realtime],
            None => &Cadence::ALL,
        };
        for &target in targets {
            if self.lane_mut(target).armed.take().is_some() {
                info!(cadence = %target, "Timer stopped");
            }
        }

        if self.standard.armed.is_none()
            && self.realtime.armed.is_none()
            && self.state == SchedulerState::Running
        {
            self.state = SchedulerState::NotStarted;
            info!("Scheduler stopped");
        }
    }

    /// Drop every installed job.
    pub fn clear(&mut self) {
        for cadence in Cadence::ALL {
            let lane = self.lane_mut(cadence);
            lane.jobs.clear();
            lane.cursor = 1;
        }
    }

    /// Advance an armed lane's cursor and return the job to dispatch.
    ///
    /// Disarmed or empty lanes yield nothing.
    pub fn tick(&mut self, cadence: Cadence) -> Option<&Job> {
        let lane = self.lane_mut(cadence);
        lane.armed?;
        lane.advance()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(MessageBuilder::default())
    }
}
