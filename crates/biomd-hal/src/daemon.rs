//! Trait seams between the sensor core and the out-of-process hardware
//! daemon.
//!
//! A daemon implementation hands back a [`HalSession`] from
//! [`SensorDaemon::create_session`] and then pushes every asynchronous result
//! through the [`EventSink`] it was given at creation time.  Replies never
//! come back on the calling path: all session commands are fire-and-forget
//! and their outcomes arrive as [`SensorEvent`]s.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use biomd_types::{BiomError, EnrollmentId, HardwareAuthToken, SensorEvent, SensorId, UserId};

/// Cheap-clone handle the hardware daemon uses to enqueue events into the
/// sensor core's serialized execution context.
///
/// Delivery never blocks.  Once the receiving router has shut down, events
/// are silently dropped.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SensorEvent>,
}

impl EventSink {
    /// Wrap the sending half of the router's event queue.
    pub fn new(tx: mpsc::UnboundedSender<SensorEvent>) -> Self {
        Self { tx }
    }

    /// Enqueue one event for routing.
    pub fn deliver(&self, event: SensorEvent) {
        if self.tx.send(event).is_err() {
            debug!("event sink closed; dropping hardware event");
        }
    }
}

/// Factory side of the daemon: creates user-bound hardware sessions.
#[async_trait]
pub trait SensorDaemon: Send + Sync {
    /// Create a hardware session bound to `user_id` and register `sink` as
    /// the callback channel for every asynchronous event the session emits.
    ///
    /// # Errors
    ///
    /// Returns [`BiomError::HalCommunication`] when the remote create call
    /// fails.  No session resources are retained on failure.
    async fn create_session(
        &self,
        sensor_id: SensorId,
        user_id: UserId,
        sink: EventSink,
    ) -> Result<Arc<dyn HalSession>, BiomError>;
}

/// A live hardware-side authentication context.
///
/// Every command is fire-and-forget: `Ok(())` means the request reached the
/// daemon, and the actual outcome arrives later through the registered
/// [`EventSink`].
///
/// # Errors
///
/// Each command returns [`BiomError::HalCommunication`] when the request
/// cannot be handed to the daemon at all.
#[async_trait]
pub trait HalSession: Send + Sync {
    /// Begin capturing a new enrollment, authorized by `token`.
    async fn enroll(&self, token: HardwareAuthToken) -> Result<(), BiomError>;

    /// Begin an authentication attempt tied to `operation_id`.
    async fn authenticate(&self, operation_id: i64) -> Result<(), BiomError>;

    /// Begin watching for sensor interaction without matching.
    async fn detect_interaction(&self) -> Result<(), BiomError>;

    /// Request the list of enrollments known to the hardware.
    async fn enumerate_enrollments(&self) -> Result<(), BiomError>;

    /// Request removal of the given enrollments.
    async fn remove_enrollments(&self, enrollment_ids: Vec<EnrollmentId>) -> Result<(), BiomError>;

    /// Request the current authenticator id for the bound user.
    async fn get_authenticator_id(&self) -> Result<(), BiomError>;

    /// Request invalidation of the current authenticator id.
    async fn invalidate_authenticator_id(&self) -> Result<(), BiomError>;

    /// Clear a hardware-enforced lockout, authorized by `token`.
    async fn reset_lockout(&self, token: HardwareAuthToken) -> Result<(), BiomError>;

    /// Close the session on the hardware side.
    async fn close(&self) -> Result<(), BiomError>;

    /// Resolve when the transport carrying this session terminates.
    ///
    /// The sensor core subscribes to this exactly once per session, at
    /// creation time.  The future must be safe to poll after the transport
    /// has already died (it resolves immediately).
    fn closed(&self) -> BoxFuture<'static, ()>;
}
