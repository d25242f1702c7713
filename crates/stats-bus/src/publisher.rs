//! Publishing side of the stats bus.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use crate::events::{EventFilter, StatsEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;

/// Anything stats events can be published to.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Broadcast `event`. Returns how many subscriptions it reached; zero is
    /// not an error, requests and replies are fire-and-forget.
    async fn publish(&self, event: StatsEvent) -> usize;
}

/// Broadcast bus shared by UI components, the dispatcher and the backend.
///
/// Every subscription receives every event and applies its own
/// [`EventFilter`], so a slow chart only ever lags itself.
#[derive(Debug)]
pub struct InMemoryEventBus {
    sender: broadcast::Sender<StatsEvent>,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus buffering up to `capacity` events per subscription.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events matching `filter`.
    ///
    /// Events published before this call are not delivered, so subscribe
    /// before asking for anything that will be answered on the bus.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Live subscriptions, whatever their filter.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: StatsEvent) -> usize {
        let kind = event.kind();
        let topic = event.topic();
        let reached = self.sender.send(event).unwrap_or(0);
        trace!(?topic, kind, reached, "Event published");
        reached
    }
}
