//! The event router – the sensor's serialized execution context.
//!
//! All asynchronous input converges here: hardware events pushed through the
//! session's [`EventSink`][biomd_hal::EventSink] and channel-death
//! notifications from the per-session death watch.  Producers only enqueue;
//! a single drain task owns delivery, so "read current operation, branch on
//! capability, mutate state" is atomic with respect to every other routed
//! event.
//!
//! Routing is validate-then-forward: each event kind requires one capability
//! of the scheduler's current operation.  A missing operation or a missing
//! capability is a routing mismatch – logged and dropped, never fatal, and
//! expected under normal races (e.g. a stray event arriving after its
//! operation already completed).  Events are forwarded in arrival order with
//! no batching beyond the enumerate/remove countdown convention.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use biomd_types::{
    BiometricIdentifier, EnrollmentId, HealthCause, HealthIssue, SensorErrorCode, SensorEvent,
    SensorId,
};

use crate::operation::Operation;
use crate::sensor::SensorShared;
use std::sync::Arc;

/// Out-of-band control input to the router.
#[derive(Debug)]
pub(crate) enum ControlMessage {
    /// The transport of the session created under `epoch` terminated.
    ChannelDied { epoch: u64 },
}

/// Merged view of the router's two inbound queues.
enum Input {
    Control(ControlMessage),
    Hal(SensorEvent),
}

/// Drains the sensor's event queues; one instance per [`Sensor`][crate::Sensor],
/// running on its own task.
pub(crate) struct EventRouter {
    shared: Arc<SensorShared>,
    hal_rx: mpsc::UnboundedReceiver<SensorEvent>,
    ctl_rx: mpsc::UnboundedReceiver<ControlMessage>,
}

impl EventRouter {
    pub(crate) fn new(
        shared: Arc<SensorShared>,
        hal_rx: mpsc::UnboundedReceiver<SensorEvent>,
        ctl_rx: mpsc::UnboundedReceiver<ControlMessage>,
    ) -> Self {
        Self {
            shared,
            hal_rx,
            ctl_rx,
        }
    }

    /// Drain both queues until the owning sensor goes away.
    pub(crate) async fn run(mut self) {
        loop {
            let input = tokio::select! {
                control = self.ctl_rx.recv() => control.map(Input::Control),
                event = self.hal_rx.recv() => event.map(Input::Hal),
            };
            match input {
                Some(Input::Control(ControlMessage::ChannelDied { epoch })) => {
                    self.on_channel_died(epoch)
                }
                Some(Input::Hal(event)) => self.route(event),
                None => break,
            }
        }
        debug!("event router stopped");
    }

    /// Validate one hardware event against the current operation and deliver
    /// it under the per-kind contract.
    fn route(&self, event: SensorEvent) {
        let sensor_id = self.shared.properties.sensor_id;
        let current = self.shared.scheduler.current_operation();
        match event {
            SensorEvent::Acquired { info, vendor_code } => {
                match current.as_deref().and_then(Operation::acquisition) {
                    Some(consumer) => consumer.on_acquired(info, vendor_code),
                    None => log_mismatch("acquired", current.as_deref()),
                }
            }

            SensorEvent::Error { error, vendor_code } => {
                debug!(
                    ?error,
                    vendor_code,
                    operation = kind_of(current.as_deref()),
                    "hardware error reported"
                );
                match current.as_deref().and_then(Operation::error_consumer) {
                    Some(consumer) => consumer.on_error(error, vendor_code),
                    None => log_mismatch("error", current.as_deref()),
                }
                // An unavailable sensor invalidates the session whether or
                // not anyone consumed the error.  Unlike channel death this
                // path records no fault marker.
                if error == SensorErrorCode::HardwareUnavailable {
                    error!("hardware unavailable; dropping current session");
                    self.shared.clear_session();
                }
            }

            SensorEvent::EnrollmentProgress {
                enrollment_id,
                remaining,
            } => match current.as_deref().and_then(Operation::enroll) {
                Some(consumer) => {
                    let name = self
                        .shared
                        .names
                        .display_name(sensor_id, consumer.target_user());
                    let identifier = BiometricIdentifier {
                        name,
                        enrollment_id,
                        sensor_id,
                    };
                    consumer.on_enroll_progress(identifier, remaining);
                }
                None => log_mismatch("enrollment_progress", current.as_deref()),
            },

            SensorEvent::AuthenticationSucceeded {
                enrollment_id,
                token,
            } => match current.as_deref().and_then(Operation::authentication) {
                Some(consumer) => {
                    let identifier = BiometricIdentifier::unnamed(enrollment_id, sensor_id);
                    consumer.on_authenticated(identifier, true, Some(token.to_bytes()));
                }
                None => log_mismatch("authentication_succeeded", current.as_deref()),
            },

            SensorEvent::AuthenticationFailed => {
                match current.as_deref().and_then(Operation::authentication) {
                    Some(consumer) => {
                        let identifier = BiometricIdentifier::unnamed(0, sensor_id);
                        consumer.on_authenticated(identifier, false, None);
                    }
                    None => log_mismatch("authentication_failed", current.as_deref()),
                }
            }

            SensorEvent::LockoutTimed { duration_ms } => {
                match current.as_deref().and_then(Operation::lockout) {
                    Some(consumer) => consumer.on_lockout_timed(duration_ms),
                    None => log_mismatch("lockout_timed", current.as_deref()),
                }
            }

            SensorEvent::LockoutPermanent => match current.as_deref().and_then(Operation::lockout) {
                Some(consumer) => consumer.on_lockout_permanent(),
                None => log_mismatch("lockout_permanent", current.as_deref()),
            },

            SensorEvent::LockoutCleared => {
                match current.as_deref().and_then(Operation::reset_lockout) {
                    Some(consumer) => consumer.on_lockout_cleared(),
                    None => log_mismatch("lockout_cleared", current.as_deref()),
                }
            }

            SensorEvent::InteractionDetected => {
                match current.as_deref().and_then(Operation::detect) {
                    Some(consumer) => consumer.on_interaction_detected(),
                    None => log_mismatch("interaction_detected", current.as_deref()),
                }
            }

            SensorEvent::EnrollmentsEnumerated { enrollment_ids } => {
                match current.as_deref().and_then(Operation::enumerate) {
                    Some(consumer) => deliver_countdown(&enrollment_ids, sensor_id, |id, left| {
                        consumer.on_enumerated(id, left)
                    }),
                    None => log_mismatch("enrollments_enumerated", current.as_deref()),
                }
            }

            SensorEvent::EnrollmentsRemoved { enrollment_ids } => {
                match current.as_deref().and_then(Operation::removal) {
                    Some(consumer) => deliver_countdown(&enrollment_ids, sensor_id, |id, left| {
                        consumer.on_removed(id, left)
                    }),
                    None => log_mismatch("enrollments_removed", current.as_deref()),
                }
            }

            SensorEvent::AuthenticatorIdRetrieved { authenticator_id } => {
                match current.as_deref().and_then(Operation::authenticator_id) {
                    Some(consumer) => consumer.on_authenticator_id_retrieved(authenticator_id),
                    None => log_mismatch("authenticator_id_retrieved", current.as_deref()),
                }
            }

            SensorEvent::AuthenticatorIdInvalidated => {
                // Reserved extension point; no consumer is wired yet.
                debug!("authenticator-id invalidation event ignored");
            }
        }
    }

    /// Handle a channel-death notification for the session created under
    /// `epoch`.
    ///
    /// Stale notifications (a replaced session, or a session already cleared
    /// by an in-band unavailable error) are dropped by epoch comparison,
    /// which makes this path idempotent.
    fn on_channel_died(&self, epoch: u64) {
        if !self.shared.is_current_epoch(epoch) {
            debug!(epoch, "stale channel-death notification ignored");
            return;
        }
        error!(epoch, "hardware channel terminated");

        let current = self.shared.scheduler.current_operation();
        match current.as_deref().and_then(Operation::error_consumer) {
            Some(consumer) => {
                warn!(
                    operation = kind_of(current.as_deref()),
                    "delivering synthetic hardware-unavailable error"
                );
                consumer.on_error(SensorErrorCode::HardwareUnavailable, 0);
            }
            None => log_mismatch("channel_died", current.as_deref()),
        }

        self.shared.scheduler.record_fault_marker();
        self.shared.health.publish(HealthIssue {
            modality: self.shared.properties.modality,
            cause: HealthCause::HalDeath,
            timestamp: Utc::now(),
        });
        self.shared.clear_session_if_epoch(epoch);
    }
}

/// Deliver a batch of enrollment ids under the reverse-countdown convention:
/// the k-th of N gets `remaining = N - k - 1`, in input order; an empty
/// batch degrades to exactly one delivery with an absent identifier.
fn deliver_countdown(
    enrollment_ids: &[EnrollmentId],
    sensor_id: SensorId,
    mut deliver: impl FnMut(Option<BiometricIdentifier>, u32),
) {
    if enrollment_ids.is_empty() {
        deliver(None, 0);
        return;
    }
    let total = enrollment_ids.len();
    for (index, enrollment_id) in enrollment_ids.iter().enumerate() {
        let identifier = BiometricIdentifier::unnamed(*enrollment_id, sensor_id);
        deliver(Some(identifier), (total - index - 1) as u32);
    }
}

fn kind_of(current: Option<&Operation>) -> &'static str {
    current.map(Operation::kind).unwrap_or("none")
}

fn log_mismatch(event: &'static str, current: Option<&Operation>) {
    warn!(
        event,
        operation = kind_of(current),
        "dropping event for operation without matching capability"
    );
}
