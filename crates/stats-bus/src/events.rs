//! # Stats Events
//!
//! Defines all event types that flow through the stats bus.

use serde::{Deserialize, Serialize};
use stats_types::{FeedAnnouncement, OwnerId, StatsRequest};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatsEvent {
    // =========================================================================
    // AVAILABILITY
    // =========================================================================
    /// The backend's listing of live feeds and their metric types.
    /// Source: Backend | Target: Dispatcher
    SourcesAnnounced(FeedAnnouncement),

    // =========================================================================
    // LISTENERS
    // =========================================================================
    /// A component wants samples of a source.
    /// Source: UI | Target: Dispatcher
    AddListener {
        /// Catalog name of the source, e.g. `Cpu`.
        source_name: String,
        /// Identity of the subscribing component.
        owner: OwnerId,
        /// Narrow the subscription to one key. `None` means every available key.
        key: Option<String>,
    },

    /// A component no longer wants samples of any source.
    /// Source: UI | Target: Dispatcher
    RemoveListener {
        /// Identity of the component going away.
        owner: OwnerId,
    },

    // =========================================================================
    // REQUESTS
    // =========================================================================
    /// Ask the backend to announce its live feeds.
    /// Source: Dispatcher | Target: Backend
    SourcesRequest,

    /// Ask the backend for samples.
    /// Source: Dispatcher | Target: Backend
    StatsRequest(StatsRequest),

    // =========================================================================
    // RESPONSES
    // =========================================================================
    /// Samples answering a `StatsRequest`, addressed by response-event name.
    /// Source: Backend | Target: UI
    StatsData {
        /// The request's `response_event`.
        response_event: String,
        /// Backend sample payload, passed through untouched.
        payload: serde_json::Value,
    },
}

impl StatsEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::SourcesAnnounced(_) => EventTopic::Availability,
            Self::AddListener { .. } | Self::RemoveListener { .. } => EventTopic::Listeners,
            Self::SourcesRequest | Self::StatsRequest(_) => EventTopic::Requests,
            Self::StatsData { .. } => EventTopic::Responses,
        }
    }

    /// Short name used in logs and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourcesAnnounced(_) => "sources_announced",
            Self::AddListener { .. } => "add_listener",
            Self::RemoveListener { .. } => "remove_listener",
            Self::SourcesRequest => "sources_request",
            Self::StatsRequest(_) => "stats_request",
            Self::StatsData { .. } => "stats_data",
        }
    }

    /// The response-event name this event is addressed to, if any.
    #[must_use]
    pub fn response_event(&self) -> Option<&str> {
        match self {
            Self::StatsRequest(request) => Some(request.response_event.as_str()),
            Self::StatsData { response_event, .. } => Some(response_event.as_str()),
            _ => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Backend feed announcements.
    Availability,
    /// Listener add/remove requests.
    Listeners,
    /// Requests from the dispatcher to the backend.
    Requests,
    /// Backend replies to subscribers.
    Responses,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Response-event names to include. Empty means all names; events without
    /// a response-event name pass only when this is empty.
    pub response_events: Vec<String>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            response_events: Vec::new(),
        }
    }

    /// Create a filter for replies addressed to one response-event name.
    #[must_use]
    pub fn responses_for(response_event: impl Into<String>) -> Self {
        Self {
            topics: vec![EventTopic::Responses],
            response_events: vec![response_event.into()],
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &StatsEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let name_match = self.response_events.is_empty()
            || event
                .response_event()
                .is_some_and(|name| self.response_events.iter().any(|n| n == name));

        topic_match && name_match
    }
}
