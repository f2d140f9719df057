use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform user identifier a session or enrollment is bound to.
pub type UserId = i32;

/// Stable identifier of one physical sensor instance.
pub type SensorId = i32;

/// Hardware-issued identifier of a single enrollment record.
pub type EnrollmentId = i64;

/// Biometric modality a sensor captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Fingerprint,
    Face,
    Iris,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Fingerprint => write!(f, "fingerprint"),
            Modality::Face => write!(f, "face"),
            Modality::Iris => write!(f, "iris"),
        }
    }
}

/// Security strength class reported by the sensor hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStrength {
    Convenience,
    Weak,
    Strong,
}

/// Static properties of one sensor, fixed for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorProperties {
    pub sensor_id: SensorId,
    pub modality: Modality,
    pub strength: SensorStrength,
    /// Upper bound the hardware enforces on enrollments per user.
    pub max_enrollments_per_user: u32,
}

/// Image-acquisition feedback reported while the sensor is capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquiredInfo {
    /// A usable capture was obtained.
    Good,
    /// Only a partial capture was obtained; the user should retry.
    Partial,
    /// Not enough data in the capture to process.
    Insufficient,
    /// The sensor surface needs cleaning.
    SensorDirty,
    /// The motion across the sensor was too slow.
    TooSlow,
    /// The motion across the sensor was too fast.
    TooFast,
    /// Vendor-defined acquisition code; see the paired vendor code.
    Vendor,
}

/// Error codes the hardware daemon reports in-band through the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorErrorCode {
    /// The hardware is gone or unrecoverable; the session must be dropped.
    HardwareUnavailable,
    /// The hardware could not process the current capture.
    UnableToProcess,
    /// The in-flight hardware operation timed out.
    Timeout,
    /// No storage left for a new enrollment.
    NoSpace,
    /// The in-flight hardware operation was canceled.
    Canceled,
    /// An enrollment could not be removed.
    UnableToRemove,
    /// Vendor-defined error; see the paired vendor code.
    Vendor,
}

/// Identifier record attached to enrollment, authentication, enumeration and
/// removal results.
///
/// `name` carries a human-readable display name only on enrollment progress;
/// every other path leaves it empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricIdentifier {
    pub name: String,
    pub enrollment_id: EnrollmentId,
    pub sensor_id: SensorId,
}

impl BiometricIdentifier {
    /// Identifier with an empty display name, the common case outside
    /// enrollment.
    pub fn unnamed(enrollment_id: EnrollmentId, sensor_id: SensorId) -> Self {
        Self {
            name: String::new(),
            enrollment_id,
            sensor_id,
        }
    }
}

/// Opaque hardware-issued authentication token proving a successful match.
///
/// The serialized form is consumed by downstream keystore components, so the
/// byte layout of [`HardwareAuthToken::to_bytes`] is frozen: a single version
/// byte, the three 64-bit identity fields little-endian, the authenticator
/// type and timestamp network-order, then the raw MAC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareAuthToken {
    pub challenge: i64,
    pub user_id: i64,
    pub authenticator_id: i64,
    pub authenticator_type: u32,
    pub timestamp_ms: i64,
    pub mac: Vec<u8>,
}

impl HardwareAuthToken {
    /// Current (and only) wire-format version.
    pub const VERSION: u8 = 0;

    /// Serialize to the frozen byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(37 + self.mac.len());
        out.push(Self::VERSION);
        out.extend_from_slice(&self.challenge.to_le_bytes());
        out.extend_from_slice(&self.user_id.to_le_bytes());
        out.extend_from_slice(&self.authenticator_id.to_le_bytes());
        out.extend_from_slice(&self.authenticator_type.to_be_bytes());
        out.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        out.extend_from_slice(&self.mac);
        out
    }
}

/// Asynchronous event stream the hardware daemon pushes through the
/// registered callback sink.
///
/// Every variant maps to exactly one delivery contract in the sensor core's
/// event router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorEvent {
    Acquired {
        info: AcquiredInfo,
        vendor_code: i32,
    },
    Error {
        error: SensorErrorCode,
        vendor_code: i32,
    },
    EnrollmentProgress {
        enrollment_id: EnrollmentId,
        remaining: u32,
    },
    AuthenticationSucceeded {
        enrollment_id: EnrollmentId,
        token: HardwareAuthToken,
    },
    AuthenticationFailed,
    LockoutTimed {
        duration_ms: u64,
    },
    LockoutPermanent,
    LockoutCleared,
    InteractionDetected,
    EnrollmentsEnumerated {
        enrollment_ids: Vec<EnrollmentId>,
    },
    EnrollmentsRemoved {
        enrollment_ids: Vec<EnrollmentId>,
    },
    AuthenticatorIdRetrieved {
        authenticator_id: u64,
    },
    AuthenticatorIdInvalidated,
}

/// Per-user lockout state tracked by the sensor core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LockoutMode {
    /// Attempts are not gated.
    #[default]
    None,
    /// Attempts are gated until the duration elapses.
    Timed { duration_ms: u64 },
    /// Attempts are gated until an explicit lockout reset.
    Permanent,
}

/// Cause tag attached to a [`HealthIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthCause {
    /// The IPC channel to the hardware daemon terminated unexpectedly.
    HalDeath,
}

/// Health-issue signal published for external diagnostics consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub modality: Modality,
    pub cause: HealthCause,
    pub timestamp: DateTime<Utc>,
}

/// Global error type spanning HAL communication failures and configuration.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum BiomError {
    /// A remote call to the hardware daemon failed outright.  Session
    /// creation propagates this to its caller; no session is installed.
    #[error("HAL Communication Failure: {0}")]
    HalCommunication(String),

    #[error("Config Error: {0}")]
    Config(String),
}
