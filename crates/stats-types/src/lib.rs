//! # Stats Types Crate
//!
//! Entities that cross the event bus between the stats dispatcher, the
//! metrics backend and the UI components subscribing to metric sources.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every payload carried by `stats-bus` is
//!   defined here.
//! - **Opaque Owners**: a subscriber is identified only by an `OwnerId`; the
//!   dispatcher compares owners and never dereferences them.
//! - **Ordered Announcements**: the backend's live feed listing keeps its
//!   announcement order, which drives the order of matched feeds.

pub mod entities;

pub use entities::*;
