//! Adapters layer: connects the dispatcher to the stats bus.

pub mod bus_adapter;

pub use bus_adapter::{BusRequestSink, DispatcherHandle, StatsBusAdapter};
