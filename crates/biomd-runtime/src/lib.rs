//! `biomd-runtime` – process-level plumbing around the sensor core.
//!
//! # Modules
//!
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace
//!   export to an OTLP-compatible collector.
//! - [`config`] – the configuration vault at `~/.biomd/config.toml`:
//!   sensor identity, modality, strength and enrollment limits, with
//!   `BIOMD_*` environment-variable overrides.
//!
//! The `biomd` binary in this crate wires a [`Sensor`][biomd_core::Sensor]
//! to the simulation daemon as a headless demonstration host.

pub mod config;
pub mod telemetry;

pub use config::Config;
pub use telemetry::{TracerProviderGuard, init_tracing};
