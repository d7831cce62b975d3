//! Observability infrastructure
//!
//! The client logs through `tracing`; this module installs the subscriber
//! that renders those events.

pub mod logging;

pub use logging::init_tracing;
