//! `biomd-hal` – the hardware daemon boundary.
//!
//! The sensor core never talks to a concrete hardware daemon directly; it
//! talks to the traits in this crate, so daemons can be swapped without
//! touching session or routing logic.
//!
//! # Modules
//!
//! - [`daemon`] – [`SensorDaemon`][daemon::SensorDaemon] (session factory),
//!   [`HalSession`][daemon::HalSession] (the per-session command surface and
//!   transport-death subscription) and [`EventSink`][daemon::EventSink] (the
//!   handle a daemon pushes asynchronous events through).
//! - [`sim`] – [`SimDaemon`][sim::SimDaemon] / [`SimSession`][sim::SimSession]:
//!   in-process simulation drivers that record issued commands and let tests
//!   inject events and transport death without physical hardware.

pub mod daemon;
pub mod sim;

pub use daemon::{EventSink, HalSession, SensorDaemon};
pub use sim::{SimCommand, SimDaemon, SimSession};
