//! Ports layer: trait boundaries of the dispatcher.

pub mod inbound;
pub mod outbound;

pub use inbound::{DispatcherSnapshot, JobSummary, StatsDispatcherApi};
pub use outbound::RequestSink;
