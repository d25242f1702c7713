//! Scripted stand-in for the stats backend.
//!
//! Answers `SourcesRequest` with the current feed listing and every
//! `StatsRequest` with a `StatsData` echo of the requested items, so flows
//! can observe what a UI component would receive.

use serde_json::json;
use stats_bus::{EventFilter, EventPublisher, EventTopic, InMemoryEventBus, StatsEvent};
use stats_types::FeedAnnouncement;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// What the backend has answered so far.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackendStats {
    pub source_requests: usize,
    pub stats_requests: usize,
}

/// Backend double sharing the dispatcher's bus.
pub struct MockBackend {
    bus: Arc<InMemoryEventBus>,
    feeds: Arc<Mutex<FeedAnnouncement>>,
    stats: Arc<Mutex<BackendStats>>,
    task: JoinHandle<()>,
}

impl MockBackend {
    /// Subscribe synchronously, then answer requests on a background task.
    ///
    /// Subscribing before the spawn means a dispatcher started afterwards
    /// cannot have its first `SourcesRequest` missed.
    pub fn spawn(bus: Arc<InMemoryEventBus>, feeds: FeedAnnouncement) -> Self {
        let feeds = Arc::new(Mutex::new(feeds));
        let stats = Arc::new(Mutex::new(BackendStats::default()));
        let mut subscription = bus.subscribe(EventFilter::topics(vec![EventTopic::Requests]));

        let task_bus = bus.clone();
        let task_feeds = feeds.clone();
        let task_stats = stats.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                let reply = match event {
                    StatsEvent::SourcesRequest => {
                        task_stats.lock().expect("stats lock").source_requests += 1;
                        let listing = task_feeds.lock().expect("feeds lock").clone();
                        StatsEvent::SourcesAnnounced(listing)
                    }
                    StatsEvent::StatsRequest(request) => {
                        task_stats.lock().expect("stats lock").stats_requests += 1;
                        StatsEvent::StatsData {
                            payload: json!({
                                "items": request.items(),
                                "step": request.options().step,
                                "start": request.options().start,
                            }),
                            response_event: request.response_event,
                        }
                    }
                    _ => continue,
                };
                task_bus.publish(reply).await;
            }
        });

        Self {
            bus,
            feeds,
            stats,
            task,
        }
    }

    /// Swap the listing and push it unsolicited, as when a device appears.
    pub async fn change_feeds(&self, feeds: FeedAnnouncement) {
        *self.feeds.lock().expect("feeds lock") = feeds.clone();
        self.bus.publish(StatsEvent::SourcesAnnounced(feeds)).await;
    }

    pub fn stats(&self) -> BackendStats {
        self.stats.lock().expect("stats lock").clone()
    }

    /// Stop answering and report the final counts.
    pub fn stop(self) -> BackendStats {
        self.task.abort();
        self.stats()
    }
}
