//! STOWAGE Telemetry - Logging Infrastructure
//!
//! Installs the `tracing` subscriber for the server binary. Request spans
//! come from `tower-http`'s `TraceLayer`.

pub mod tracer;

pub use tracer::{init_tracer, TelemetryConfig};
