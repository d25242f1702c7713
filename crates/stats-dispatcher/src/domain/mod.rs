//! Domain layer: pure dispatcher logic, no I/O and no clocks.

pub mod availability;
pub mod catalog;
pub mod config;
pub mod listeners;
pub mod message;
pub mod scheduler;
pub mod source;

pub use availability::AvailabilityResolver;
pub use catalog::{default_catalog, SourceRegistry, SourceSnapshot};
pub use config::{DispatcherConfig, DispatcherConfigBuilder, MIN_INTERVAL};
pub use listeners::{ListenerRegistration, ListenerSet};
pub use message::{capitalize, MessageBuilder, DEFAULT_NOISE_FILTER};
pub use scheduler::{Job, JobId, Rebuild, Scheduler, SchedulerState};
pub use source::{Cadence, KeyMode, MetricSource, SourceDescriptor};
