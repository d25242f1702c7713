//! # Stats Dispatcher Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks
//! │   └── dispatcher_benchmarks.rs
//! │
//! └── src/
//!     └── integration/  # Dispatcher, backend and UI choreography over the bus
//!         ├── backend.rs
//!         └── flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p stats-tests
//!
//! # Integration flows only
//! cargo test -p stats-tests integration::
//!
//! # Benchmarks
//! cargo bench -p stats-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
