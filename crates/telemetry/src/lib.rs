//! Telemetry for the bookshelf services.
//!
//! Structured logging setup, process-local counters, and the component
//! health registry read by the web tier's probes.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
