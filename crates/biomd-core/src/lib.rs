//! `biomd-core` – Sensor session lifecycle & event routing
//!
//! The hard part of the biometric stack: bridging an untrusted, asynchronous,
//! failure-prone hardware daemon with a strictly ordered operation pipeline,
//! without corrupting authentication state or crashing the host process.
//!
//! # Modules
//!
//! - [`sensor`] – [`Sensor`][sensor::Sensor]:
//!   composition root for one physical sensor.  Owns at most one live
//!   hardware session (created, replaced, and invalidated here), the
//!   per-user state tables, and the router task.
//! - [`router`] – the serialized execution context: a single drain task that
//!   validates every asynchronous hardware event against the current
//!   operation's capabilities and applies the per-kind delivery contracts,
//!   including the enumerate/remove countdown convention and the
//!   hardware-unavailable session invalidation.
//! - [`operation`] – [`Operation`][operation::Operation]:
//!   the closed set of externally-scheduled operation kinds, each variant
//!   bundling exactly the capability traits it implements.
//! - [`scheduler`] – [`Scheduler`][scheduler::Scheduler]:
//!   the interface boundary to the external operation scheduler.
//! - [`lockout`] – [`LockoutCache`][lockout::LockoutCache]:
//!   per-user lockout state (none / timed / permanent).
//! - [`authenticator`] – [`AuthenticatorIdTable`][authenticator::AuthenticatorIdTable]:
//!   last known authenticator id per user, for external key-invalidation
//!   decisions.
//! - [`health`] – [`HealthBus`][health::HealthBus]:
//!   broadcast channel carrying health-issue signals such as HAL death.

pub mod authenticator;
pub mod health;
pub mod lockout;
pub mod operation;
mod router;
pub mod scheduler;
pub mod sensor;

pub use authenticator::AuthenticatorIdTable;
pub use health::HealthBus;
pub use lockout::LockoutCache;
pub use operation::{
    AcquisitionConsumer, AuthenticateOperation, AuthenticationConsumer, DetectConsumer,
    DetectOperation, EnrollConsumer, EnrollOperation, EnumerateConsumer, EnumerateOperation,
    ErrorConsumer, GetAuthenticatorIdConsumer, GetAuthenticatorIdOperation, LockoutConsumer,
    Operation, RemovalConsumer, RemoveOperation, ResetLockoutConsumer, ResetLockoutOperation,
};
pub use scheduler::Scheduler;
pub use sensor::{DefaultNameResolver, LazySession, NameResolver, Sensor};
