//! Outbound Ports (Driven Ports)
//!
//! What the dispatcher needs from the outside world: somewhere to send
//! requests. Delivery is fire-and-forget.

use async_trait::async_trait;
use stats_types::StatsRequest;

/// Destination of everything the dispatcher emits (Driven Port)
#[async_trait]
pub trait RequestSink: Send + Sync {
    /// Send one stats request to the backend.
    async fn emit(&self, request: StatsRequest);

    /// Ask the backend to announce its live feeds.
    async fn request_sources(&self);
}
