//! # Stats Dispatcher
//!
//! Metric subscription and polling dispatcher. Components register interest
//! in metric sources; the dispatcher matches the static source catalog
//! against the feeds the backend announces and keeps two timed loops
//! replaying the resulting stats requests.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure logic, no I/O and no clocks
//!   - `SourceRegistry`: Catalog of metric sources, built once
//!   - `AvailabilityResolver`: Matches sources against announced feeds
//!   - `MessageBuilder`: Turns one key of a source into one `StatsRequest`
//!   - `ListenerSet`: Registrations per source
//!   - `Scheduler`: Standard and realtime job lanes with round-robin ticks
//!   - `DispatcherConfig` / `DispatcherConfigBuilder`: Intervals and polling window
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `StatsDispatcherApi`: Driving port (inbound API)
//!   - `RequestSink`: Driven port (where requests go)
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `StatsDispatcherService`: Implements `StatsDispatcherApi`
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `StatsBusAdapter`: Single task multiplexing bus events and both timers
//!   - `BusRequestSink`: Publishes requests on the stats bus
//!
//! ## Flow
//!
//! ```text
//! SourcesAnnounced ──→ resolve availability ──→ rebuild sources with listeners ──→ start
//! AddListener ───────→ rebuild that source ──┐
//! RemoveListener ────→ rebuild affected ─────┴──→ Scheduler lanes
//!                                                   │
//! standard / realtime tick ──→ next job (round robin) ──→ StatsRequest on the bus
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use stats_bus::InMemoryEventBus;
//! use stats_dispatcher::{DispatcherConfig, StatsBusAdapter};
//! use std::sync::Arc;
//!
//! let bus = Arc::new(InMemoryEventBus::new());
//! let handle = StatsBusAdapter::for_bus(bus.clone(), DispatcherConfig::from_env()?).spawn();
//!
//! // ... components publish AddListener / RemoveListener, the backend
//! // answers SourcesRequest with SourcesAnnounced ...
//!
//! let service = handle.shutdown().await;
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{BusRequestSink, DispatcherHandle, StatsBusAdapter};
pub use domain::{
    capitalize, default_catalog, AvailabilityResolver, Cadence, DispatcherConfig,
    DispatcherConfigBuilder, Job, JobId, KeyMode, ListenerRegistration, MessageBuilder,
    MetricSource, Scheduler, SchedulerState, SourceDescriptor, SourceRegistry, SourceSnapshot,
};
pub use error::DispatchError;
pub use ports::{DispatcherSnapshot, JobSummary, RequestSink, StatsDispatcherApi};
pub use service::{StatsDispatcherService, TimerPlan};
