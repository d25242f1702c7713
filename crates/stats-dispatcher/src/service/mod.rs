//! Service layer: orchestration of the domain behind the inbound port.

pub mod dispatcher_service;

pub use dispatcher_service::{StatsDispatcherService, TimerPlan};
