//! In-process simulation daemon for CI/headless testing without sensor
//! hardware.
//!
//! [`SimDaemon`] implements [`SensorDaemon`] with stub sessions that record
//! every issued command and expose the registered [`EventSink`], so tests can
//! drive the full routing stack: issue a command, inject the hardware reply,
//! observe the delivery.  Transport death is simulated with
//! [`SimSession::trigger_hal_death`].
//!
//! # Example
//!
//! ```rust
//! use biomd_hal::{EventSink, SensorDaemon, SimDaemon};
//! use biomd_types::SensorEvent;
//! use tokio::sync::mpsc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let daemon = SimDaemon::new();
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let session = daemon
//!     .create_session(0, 10, EventSink::new(tx))
//!     .await
//!     .expect("sim create must succeed");
//! session.authenticate(99).await.expect("sim command must succeed");
//!
//! daemon.last_session().unwrap().emit(SensorEvent::AuthenticationFailed);
//! assert_eq!(rx.recv().await, Some(SensorEvent::AuthenticationFailed));
//! # });
//! ```

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::debug;

use biomd_types::{BiomError, EnrollmentId, HardwareAuthToken, SensorEvent, SensorId, UserId};

use crate::daemon::{EventSink, HalSession, SensorDaemon};

/// A command issued against a [`SimSession`], recorded for assertion.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    Enroll,
    Authenticate { operation_id: i64 },
    DetectInteraction,
    EnumerateEnrollments,
    RemoveEnrollments { enrollment_ids: Vec<EnrollmentId> },
    GetAuthenticatorId,
    InvalidateAuthenticatorId,
    ResetLockout,
    Close,
}

/// Simulated hardware daemon.  Always succeeds unless told otherwise with
/// [`SimDaemon::set_create_failure`].
#[derive(Default)]
pub struct SimDaemon {
    fail_create: AtomicBool,
    sessions: Mutex<Vec<Arc<SimSession>>>,
}

impl SimDaemon {
    /// Create a daemon with no sessions and failure injection disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// When `fail` is set, every subsequent `create_session` call returns
    /// [`BiomError::HalCommunication`] until cleared.
    pub fn set_create_failure(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// The most recently created session, if any.
    pub fn last_session(&self) -> Option<Arc<SimSession>> {
        self.sessions
            .lock()
            .expect("sim session list poisoned")
            .last()
            .cloned()
    }

    /// Total number of sessions created over the daemon's lifetime.
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .expect("sim session list poisoned")
            .len()
    }
}

#[async_trait]
impl SensorDaemon for SimDaemon {
    async fn create_session(
        &self,
        sensor_id: SensorId,
        user_id: UserId,
        sink: EventSink,
    ) -> Result<Arc<dyn HalSession>, BiomError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BiomError::HalCommunication(
                "simulated create_session failure".to_string(),
            ));
        }
        let (closed_tx, closed_rx) = watch::channel(false);
        let session = Arc::new(SimSession {
            sensor_id,
            user_id,
            sink,
            commands: Mutex::new(Vec::new()),
            closed_tx,
            closed_rx,
        });
        debug!(sensor_id, user_id, "sim session created");
        self.sessions
            .lock()
            .expect("sim session list poisoned")
            .push(Arc::clone(&session));
        Ok(session)
    }
}

/// A stub hardware session that records commands and lets tests emit events
/// through the sink registered at creation.
pub struct SimSession {
    sensor_id: SensorId,
    user_id: UserId,
    sink: EventSink,
    commands: Mutex<Vec<SimCommand>>,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl SimSession {
    /// The sensor this session was created against.
    pub fn sensor_id(&self) -> SensorId {
        self.sensor_id
    }

    /// The user this session is bound to.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Push an event through the sink registered for this session, as the
    /// real daemon would after completing a hardware operation.
    pub fn emit(&self, event: SensorEvent) {
        self.sink.deliver(event);
    }

    /// Simulate the IPC transport dying: every [`HalSession::closed`] future
    /// obtained from this session resolves.
    pub fn trigger_hal_death(&self) {
        let _ = self.closed_tx.send(true);
    }

    /// Snapshot of every command issued so far, in issue order.
    pub fn commands(&self) -> Vec<SimCommand> {
        self.commands
            .lock()
            .expect("sim command log poisoned")
            .clone()
    }

    fn record(&self, command: SimCommand) -> Result<(), BiomError> {
        self.commands
            .lock()
            .expect("sim command log poisoned")
            .push(command);
        Ok(())
    }
}

#[async_trait]
impl HalSession for SimSession {
    async fn enroll(&self, _token: HardwareAuthToken) -> Result<(), BiomError> {
        self.record(SimCommand::Enroll)
    }

    async fn authenticate(&self, operation_id: i64) -> Result<(), BiomError> {
        self.record(SimCommand::Authenticate { operation_id })
    }

    async fn detect_interaction(&self) -> Result<(), BiomError> {
        self.record(SimCommand::DetectInteraction)
    }

    async fn enumerate_enrollments(&self) -> Result<(), BiomError> {
        self.record(SimCommand::EnumerateEnrollments)
    }

    async fn remove_enrollments(&self, enrollment_ids: Vec<EnrollmentId>) -> Result<(), BiomError> {
        self.record(SimCommand::RemoveEnrollments { enrollment_ids })
    }

    async fn get_authenticator_id(&self) -> Result<(), BiomError> {
        self.record(SimCommand::GetAuthenticatorId)
    }

    async fn invalidate_authenticator_id(&self) -> Result<(), BiomError> {
        self.record(SimCommand::InvalidateAuthenticatorId)
    }

    async fn reset_lockout(&self, _token: HardwareAuthToken) -> Result<(), BiomError> {
        self.record(SimCommand::ResetLockout)
    }

    async fn close(&self) -> Result<(), BiomError> {
        self.record(SimCommand::Close)
    }

    fn closed(&self) -> BoxFuture<'static, ()> {
        let mut rx = self.closed_rx.clone();
        Box::pin(async move {
            if *rx.borrow() {
                return;
            }
            // Resolve on the death flag flipping, or on the session itself
            // being dropped (sender gone).
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return;
                }
            }
        })
    }
}
