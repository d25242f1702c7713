//! Listener registrations
//!
//! Each source keeps the registrations of components that want its samples.
//! A registration is identified by `(owner, key)`; the same owner may listen
//! to several keys of one source.

use serde::Serialize;
use stats_types::OwnerId;

use super::scheduler::JobId;

/// One component's interest in one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerRegistration {
    pub owner: OwnerId,
    pub source_name: String,
    /// `None` listens to every available key.
    pub key: Option<String>,
    /// Job last built for this registration, if it produced one.
    pub(crate) job: Option<JobId>,
}

impl ListenerRegistration {
    pub fn new(owner: OwnerId, source_name: impl Into<String>, key: Option<String>) -> Self {
        Self {
            owner,
            source_name: source_name.into(),
            key,
            job: None,
        }
    }

    /// Cached job id.
    #[must_use]
    pub fn job(&self) -> Option<JobId> {
        self.job
    }

    fn same_identity(&self, other: &Self) -> bool {
        self.owner == other.owner && self.key == other.key
    }
}

/// Registrations of a single source, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ListenerSet {
    entries: Vec<ListenerRegistration>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a registration.
    ///
    /// Returns `false` and leaves the set untouched if one with the same
    /// `(owner, key)` is already present.
    pub fn insert(&mut self, registration: ListenerRegistration) -> bool {
        if self.entries.iter().any(|r| r.same_identity(&registration)) {
            return false;
        }
        self.entries.push(registration);
        true
    }

    /// Remove every registration held by `owner`.
    pub fn remove_owner(&mut self, owner: OwnerId) -> Vec<ListenerRegistration> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|r| r.owner == owner);
        self.entries = kept;
        removed
    }

    pub fn contains_owner(&self, owner: OwnerId) -> bool {
        self.entries.iter().any(|r| r.owner == owner)
    }

    /// Distinct job ids cached on the registrations.
    pub fn cached_jobs(&self) -> Vec<JobId> {
        let mut jobs: Vec<JobId> = self.entries.iter().filter_map(|r| r.job).collect();
        jobs.sort_unstable();
        jobs.dedup();
        jobs
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListenerRegistration> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ListenerRegistration> {
        self.entries.iter_mut()
    }

    pub(crate) fn clear_jobs(&mut self) {
        for entry in &mut self.entries {
            entry.job = None;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
