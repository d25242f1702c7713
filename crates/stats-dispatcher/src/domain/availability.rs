//! Availability resolution
//!
//! Matches each source against the backend's announced feeds. `available`
//! and `properties` are replaced wholesale on every announcement.

use stats_types::FeedAnnouncement;

use super::source::{KeyMode, MetricSource};

/// Recomputes `available` and `properties` from a feed announcement.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityResolver;

impl AvailabilityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a single source.
    pub fn resolve(&self, source: &mut MetricSource, feeds: &FeedAnnouncement) {
        let mut available = Vec::new();
        let mut properties = Vec::new();

        match source.mode() {
            KeyMode::DatasetKeys {
                datasets_type,
                keys,
            } => {
                // Sub-series come from the descriptor, not the backend
                if feeds.contains(datasets_type) {
                    available.push(datasets_type.clone());
                    properties = keys.clone();
                }
            }
            KeyMode::Wildcard | KeyMode::Bidirectional { .. } => {
                available.extend(
                    feeds
                        .ids()
                        .filter(|id| id.starts_with(source.prefix()))
                        .map(str::to_string),
                );
            }
            KeyMode::ExplicitKeys(keys) => {
                available.extend(
                    keys.iter()
                        .map(|key| format!("{}{}", source.prefix(), key))
                        .filter(|id| feeds.contains(id)),
                );
            }
        }

        if !matches!(source.mode(), KeyMode::DatasetKeys { .. }) {
            if let Some(types) = available.first().and_then(|id| feeds.metric_types(id)) {
                properties = types.to_vec();
            }
        }

        source.available = available;
        source.properties = properties;
    }

    /// Resolve every source in order.
    pub fn resolve_all<'a, I>(&self, sources: I, feeds: &FeedAnnouncement)
    where
        I: IntoIterator<Item = &'a mut MetricSource>,
    {
        for source in sources {
            self.resolve(source, feeds);
        }
    }
}
