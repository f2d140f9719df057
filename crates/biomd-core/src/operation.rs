//! The capability surface of externally-scheduled operations.
//!
//! An operation (enroll, authenticate, remove, …) is owned and sequenced by
//! the external scheduler; this core only ever sees "whatever the scheduler
//! currently reports" and must decide, per hardware event, whether that
//! operation can consume it.  Instead of runtime type inspection, the
//! operation space is a closed set of tagged [`Operation`] variants, each
//! bundling exactly the capability traits that operation kind implements.
//! The event router matches on capability presence via the accessor methods.

use std::sync::Arc;

use biomd_types::{AcquiredInfo, BiometricIdentifier, SensorErrorCode, UserId};

// ────────────────────────────────────────────────────────────────────────────
// Capability traits
// ────────────────────────────────────────────────────────────────────────────

/// Consumes image-acquisition feedback while the sensor is capturing.
pub trait AcquisitionConsumer: Send + Sync {
    fn on_acquired(&self, info: AcquiredInfo, vendor_code: i32);
}

/// Consumes hardware error reports, including the synthetic
/// hardware-unavailable error raised on channel death.
pub trait ErrorConsumer: Send + Sync {
    fn on_error(&self, error: SensorErrorCode, vendor_code: i32);
}

/// Consumes authentication outcomes.
///
/// `token` carries the serialized hardware auth token on success and is
/// absent on failure.
pub trait AuthenticationConsumer: Send + Sync {
    fn on_authenticated(
        &self,
        identifier: BiometricIdentifier,
        success: bool,
        token: Option<Vec<u8>>,
    );
}

/// Consumes enrollment progress.
pub trait EnrollConsumer: Send + Sync {
    /// The user this enrollment is being captured for; the router resolves
    /// the display name of progress identifiers against it.
    fn target_user(&self) -> UserId;

    fn on_enroll_progress(&self, identifier: BiometricIdentifier, remaining: u32);
}

/// Consumes hardware-reported lockout transitions.
pub trait LockoutConsumer: Send + Sync {
    fn on_lockout_timed(&self, duration_ms: u64);
    fn on_lockout_permanent(&self);
}

/// Consumes lockout-cleared notifications.
pub trait ResetLockoutConsumer: Send + Sync {
    fn on_lockout_cleared(&self);
}

/// Consumes enumeration results.  `identifier` is absent exactly when the
/// hardware reported an empty enrollment list.
pub trait EnumerateConsumer: Send + Sync {
    fn on_enumerated(&self, identifier: Option<BiometricIdentifier>, remaining: u32);
}

/// Consumes removal results, with the same empty-list convention as
/// [`EnumerateConsumer`].
pub trait RemovalConsumer: Send + Sync {
    fn on_removed(&self, identifier: Option<BiometricIdentifier>, remaining: u32);
}

/// Consumes interaction-detected notifications.
pub trait DetectConsumer: Send + Sync {
    fn on_interaction_detected(&self);
}

/// Consumes the result of a retrieve-authenticator-id round trip.
pub trait GetAuthenticatorIdConsumer: Send + Sync {
    fn on_authenticator_id_retrieved(&self, authenticator_id: u64);
}

// ────────────────────────────────────────────────────────────────────────────
// Per-kind capability bundles
// ────────────────────────────────────────────────────────────────────────────

/// Capability bundle of an enrollment operation.
pub trait EnrollOperation: AcquisitionConsumer + ErrorConsumer + EnrollConsumer {}
impl<T: AcquisitionConsumer + ErrorConsumer + EnrollConsumer> EnrollOperation for T {}

/// Capability bundle of an authentication operation.
pub trait AuthenticateOperation:
    AcquisitionConsumer + ErrorConsumer + AuthenticationConsumer + LockoutConsumer
{
}
impl<T: AcquisitionConsumer + ErrorConsumer + AuthenticationConsumer + LockoutConsumer>
    AuthenticateOperation for T
{
}

/// Capability bundle of an interaction-detection operation.
pub trait DetectOperation: AcquisitionConsumer + ErrorConsumer + DetectConsumer {}
impl<T: AcquisitionConsumer + ErrorConsumer + DetectConsumer> DetectOperation for T {}

/// Capability bundle of a removal operation.
pub trait RemoveOperation: ErrorConsumer + RemovalConsumer {}
impl<T: ErrorConsumer + RemovalConsumer> RemoveOperation for T {}

/// Capability bundle of an enumeration operation.
pub trait EnumerateOperation: ErrorConsumer + EnumerateConsumer {}
impl<T: ErrorConsumer + EnumerateConsumer> EnumerateOperation for T {}

/// Capability bundle of a lockout-reset operation.
pub trait ResetLockoutOperation: ErrorConsumer + ResetLockoutConsumer {}
impl<T: ErrorConsumer + ResetLockoutConsumer> ResetLockoutOperation for T {}

/// Capability bundle of an authenticator-id retrieval operation.
pub trait GetAuthenticatorIdOperation: GetAuthenticatorIdConsumer {}
impl<T: GetAuthenticatorIdConsumer> GetAuthenticatorIdOperation for T {}

// ────────────────────────────────────────────────────────────────────────────
// The closed operation set
// ────────────────────────────────────────────────────────────────────────────

/// One externally-scheduled unit of work, tagged by kind.
///
/// Each variant carries only the capability handlers that operation kind
/// actually implements; the accessors below return `None` for every
/// capability the variant lacks, which the router treats as a routing
/// mismatch (logged and dropped, never fatal).
#[derive(Clone)]
pub enum Operation {
    Enroll(Arc<dyn EnrollOperation>),
    Authenticate(Arc<dyn AuthenticateOperation>),
    Detect(Arc<dyn DetectOperation>),
    Remove(Arc<dyn RemoveOperation>),
    Enumerate(Arc<dyn EnumerateOperation>),
    ResetLockout(Arc<dyn ResetLockoutOperation>),
    GetAuthenticatorId(Arc<dyn GetAuthenticatorIdOperation>),
}

impl Operation {
    /// Stable kind tag, used in routing-mismatch log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Enroll(_) => "enroll",
            Operation::Authenticate(_) => "authenticate",
            Operation::Detect(_) => "detect",
            Operation::Remove(_) => "remove",
            Operation::Enumerate(_) => "enumerate",
            Operation::ResetLockout(_) => "reset_lockout",
            Operation::GetAuthenticatorId(_) => "get_authenticator_id",
        }
    }

    pub fn acquisition(&self) -> Option<&dyn AcquisitionConsumer> {
        match self {
            Operation::Enroll(op) => Some(op.as_ref()),
            Operation::Authenticate(op) => Some(op.as_ref()),
            Operation::Detect(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    pub fn error_consumer(&self) -> Option<&dyn ErrorConsumer> {
        match self {
            Operation::Enroll(op) => Some(op.as_ref()),
            Operation::Authenticate(op) => Some(op.as_ref()),
            Operation::Detect(op) => Some(op.as_ref()),
            Operation::Remove(op) => Some(op.as_ref()),
            Operation::Enumerate(op) => Some(op.as_ref()),
            Operation::ResetLockout(op) => Some(op.as_ref()),
            Operation::GetAuthenticatorId(_) => None,
        }
    }

    pub fn authentication(&self) -> Option<&dyn AuthenticationConsumer> {
        match self {
            Operation::Authenticate(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    pub fn enroll(&self) -> Option<&dyn EnrollConsumer> {
        match self {
            Operation::Enroll(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    pub fn lockout(&self) -> Option<&dyn LockoutConsumer> {
        match self {
            Operation::Authenticate(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    pub fn reset_lockout(&self) -> Option<&dyn ResetLockoutConsumer> {
        match self {
            Operation::ResetLockout(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    pub fn enumerate(&self) -> Option<&dyn EnumerateConsumer> {
        match self {
            Operation::Enumerate(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    pub fn removal(&self) -> Option<&dyn RemovalConsumer> {
        match self {
            Operation::Remove(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    pub fn detect(&self) -> Option<&dyn DetectConsumer> {
        match self {
            Operation::Detect(op) => Some(op.as_ref()),
            _ => None,
        }
    }

    pub fn authenticator_id(&self) -> Option<&dyn GetAuthenticatorIdConsumer> {
        match self {
            Operation::GetAuthenticatorId(op) => Some(op.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Operation").field(&self.kind()).finish()
    }
}
