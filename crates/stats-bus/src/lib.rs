//! # Stats Bus - Event Bus for the Stats Dispatcher
//!
//! Every interaction with the dispatcher goes through this bus: UI
//! components publish listener requests, the metrics backend publishes feed
//! announcements, and the dispatcher publishes stats requests.
//!
//! ```text
//! ┌──────────────┐  AddListener /     ┌──────────────┐
//! │ UI component │  RemoveListener    │  Dispatcher  │
//! │              │ ─────┐             │              │
//! └──────────────┘      │             └──────────────┘
//!        ↑              ▼               ↑         │
//!        │        ┌──────────────┐      │         │ SourcesRequest /
//!        │        │  Event Bus   │ ─────┘         │ StatsRequest
//!        │        │              │ ←──────────────┘
//!        │        └──────────────┘
//!        │              │ ↑
//!   StatsData           ▼ │ SourcesAnnounced / StatsData
//!        │        ┌──────────────┐
//!        └─────── │   Backend    │
//!                 └──────────────┘
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, StatsEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::Subscription;

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
