//! # Core Entities
//!
//! ## Clusters
//!
//! - **Availability**: `LiveFeed`, `FeedAnnouncement`
//! - **Subscription**: `OwnerId`
//! - **Requests**: `StatsRequest`, `DataItem`, `PollOptions`, `RequestArgs`

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: AVAILABILITY
// =============================================================================

/// One live metric stream reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveFeed {
    /// Feed identifier, e.g. `cpu-user` or `interface-em0`.
    pub id: String,
    /// Metric-type names the feed offers, in backend order.
    pub metric_types: Vec<String>,
}

impl LiveFeed {
    /// Create a feed entry.
    pub fn new(id: impl Into<String>, metric_types: Vec<String>) -> Self {
        Self {
            id: id.into(),
            metric_types,
        }
    }
}

/// The backend's full listing of live feeds.
///
/// Order is significant: wildcard sources list their matches in the order the
/// backend announced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAnnouncement {
    /// Announced feeds.
    pub feeds: Vec<LiveFeed>,
}

impl FeedAnnouncement {
    /// Create an empty announcement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method appending one feed.
    #[must_use]
    pub fn with_feed<I, S>(mut self, id: &str, metric_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feeds.push(LiveFeed::new(
            id,
            metric_types.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Whether a feed id was announced.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.feeds.iter().any(|f| f.id == id)
    }

    /// Metric-type metadata of a feed, if announced.
    #[must_use]
    pub fn metric_types(&self, id: &str) -> Option<&[String]> {
        self.feeds
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.metric_types.as_slice())
    }

    /// Announced feed ids in announcement order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.feeds.iter().map(|f| f.id.as_str())
    }

    /// Number of announced feeds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Whether nothing was announced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

// =============================================================================
// CLUSTER B: SUBSCRIPTION
// =============================================================================

/// Opaque identity of a subscribing component.
///
/// Only ever compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    /// Generate a fresh owner identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CLUSTER C: REQUESTS
// =============================================================================

/// One `{source, type, dataset}` triple the backend should return.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataItem {
    /// Feed id to read from.
    pub source: String,
    /// Metric type within the feed.
    #[serde(rename = "type")]
    pub metric_type: String,
    /// Named sub-series within the metric type.
    pub dataset: String,
}

impl DataItem {
    /// Create a data item.
    pub fn new(
        source: impl Into<String>,
        metric_type: impl Into<String>,
        dataset: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            metric_type: metric_type.into(),
            dataset: dataset.into(),
        }
    }
}

/// Polling window sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollOptions {
    /// Sample step.
    pub step: String,
    /// Relative start of the window, e.g. `now-10m`.
    pub start: String,
}

impl PollOptions {
    /// Options for a step and a lookback in minutes.
    #[must_use]
    pub fn new(step: u64, lookback_minutes: u64) -> Self {
        Self {
            step: step.to_string(),
            start: format!("now-{lookback_minutes}m"),
        }
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

/// Positional request arguments, serialized as `[items, options]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestArgs(pub Vec<DataItem>, pub PollOptions);

/// A request for metric samples.
///
/// The backend answers on `response_event` directly to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    /// Event name the backend replies on.
    pub response_event: String,
    /// Prefix charts use to label series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_prefix: Option<String>,
    /// Items and polling window.
    pub args: RequestArgs,
}

impl StatsRequest {
    /// Requested items.
    #[must_use]
    pub fn items(&self) -> &[DataItem] {
        &self.args.0
    }

    /// Polling window.
    #[must_use]
    pub fn options(&self) -> &PollOptions {
        &self.args.1
    }
}
