//! Interface boundary to the external operation scheduler.
//!
//! The scheduler decides which operation runs next and in what order; this
//! core only consumes its notion of "the current operation" and reports
//! faults back to it.  Scheduling policy lives entirely on the other side of
//! this trait.

use std::sync::Arc;

use crate::operation::Operation;

/// Handle to the external scheduler collaborator.
pub trait Scheduler: Send + Sync {
    /// The operation currently selected to run, if any.
    ///
    /// Resolved fresh on every routed event; the router never caches the
    /// returned handle.
    fn current_operation(&self) -> Option<Arc<Operation>>;

    /// Record a crash/fault marker for diagnostics after a hardware channel
    /// death.
    fn record_fault_marker(&self);
}
