//! Receiving side of the stats bus.

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::warn;

use crate::events::{EventFilter, StatsEvent};

/// Filtered view of the bus for one consumer.
///
/// Events that do not match the filter are skipped on receive. A consumer
/// that falls more than the bus capacity behind loses the oldest events;
/// the loss is counted in [`Subscription::lagged`].
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<StatsEvent>,
    filter: EventFilter,
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: Receiver<StatsEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Wait for the next matching event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<StatsEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => self.record_lag(missed),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already buffered, without waiting.
    pub fn try_recv(&mut self) -> Option<StatsEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(TryRecvError::Lagged(missed)) => self.record_lag(missed),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Every matching event currently buffered, oldest first.
    pub fn drain(&mut self) -> Vec<StatsEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Events lost because this consumer fell behind.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    fn record_lag(&mut self, missed: u64) {
        self.lagged += missed;
        warn!(missed, topics = ?self.filter.topics, "Subscription fell behind, events dropped");
    }
}
