//! [`Sensor`] – composition root for one physical sensor.
//!
//! Owns at most one live [`HalSession`] at a time, the per-user
//! [`LockoutCache`] and [`AuthenticatorIdTable`], the [`HealthBus`], and the
//! event router task that forms the sensor's serialized execution context.
//! Operations reach the hardware through [`Sensor::lazy_session`] so they
//! never hold a stale handle across a suspension point.
//!
//! # Session lifecycle
//!
//! `Absent → Active` on [`Sensor::create_session`]; back to `Absent` when the
//! hardware reports an unrecoverable error or the IPC channel to the daemon
//! terminates.  A second create while Active replaces the session with no
//! intermediate observable state.  Each session carries a monotonically
//! increasing epoch; the death watch registered at creation is aborted on
//! replacement and its notifications are epoch-checked, so a stale watch can
//! never fire against a newer session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use biomd_hal::{EventSink, HalSession, SensorDaemon};
use biomd_types::{BiomError, HealthIssue, SensorId, SensorProperties, UserId};

use crate::authenticator::AuthenticatorIdTable;
use crate::health::HealthBus;
use crate::lockout::LockoutCache;
use crate::router::{ControlMessage, EventRouter};
use crate::scheduler::Scheduler;

/// Resolves the display name attached to enrollment-progress identifiers.
///
/// Enrollment persistence lives outside this core, so hosts that track named
/// enrollment records inject their own resolver.
pub trait NameResolver: Send + Sync {
    fn display_name(&self, sensor_id: SensorId, user_id: UserId) -> String;
}

/// Fallback resolver producing a deterministic placeholder name.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNameResolver;

impl NameResolver for DefaultNameResolver {
    fn display_name(&self, _sensor_id: SensorId, user_id: UserId) -> String {
        format!("Biometric {user_id}")
    }
}

/// State shared between the [`Sensor`] handle, the router task, and
/// outstanding [`LazySession`] handles.
pub(crate) struct SensorShared {
    pub(crate) properties: SensorProperties,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) lockout: Arc<LockoutCache>,
    pub(crate) authenticator_ids: Arc<AuthenticatorIdTable>,
    pub(crate) health: HealthBus,
    pub(crate) names: Arc<dyn NameResolver>,
    current: Mutex<Option<SessionSlot>>,
}

impl SensorShared {
    /// Drop the current session unconditionally.
    pub(crate) fn clear_session(&self) {
        self.current
            .lock()
            .expect("session slot lock poisoned")
            .take();
    }

    /// Drop the current session only if it still belongs to `epoch`.
    pub(crate) fn clear_session_if_epoch(&self, epoch: u64) {
        let mut current = self.current.lock().expect("session slot lock poisoned");
        if matches!(current.as_ref(), Some(slot) if slot.epoch == epoch) {
            *current = None;
        }
    }

    /// Whether the current session (if any) was created under `epoch`.
    pub(crate) fn is_current_epoch(&self, epoch: u64) -> bool {
        matches!(
            self.current
                .lock()
                .expect("session slot lock poisoned")
                .as_ref(),
            Some(slot) if slot.epoch == epoch
        )
    }
}

/// One installed session: epoch identity, bound user, hardware handle, and
/// the death-watch task that reports transport termination.
struct SessionSlot {
    epoch: u64,
    user_id: UserId,
    handle: Arc<dyn HalSession>,
    death_watch: JoinHandle<()>,
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        // A replaced or cleared session must never report its death.
        self.death_watch.abort();
    }
}

/// Maintains the state of a single sensor instance.
pub struct Sensor {
    shared: Arc<SensorShared>,
    hal_sink: EventSink,
    ctl_tx: mpsc::UnboundedSender<ControlMessage>,
    epochs: AtomicU64,
    router: JoinHandle<()>,
}

impl Sensor {
    /// Build a sensor with the [`DefaultNameResolver`].
    ///
    /// Spawns the router task, so this must be called within a Tokio
    /// runtime.
    pub fn new(properties: SensorProperties, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::with_name_resolver(properties, scheduler, Arc::new(DefaultNameResolver))
    }

    /// Build a sensor with a host-supplied [`NameResolver`].
    pub fn with_name_resolver(
        properties: SensorProperties,
        scheduler: Arc<dyn Scheduler>,
        names: Arc<dyn NameResolver>,
    ) -> Self {
        let (hal_tx, hal_rx) = mpsc::unbounded_channel();
        let (ctl_tx, ctl_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SensorShared {
            properties,
            scheduler,
            lockout: Arc::new(LockoutCache::new()),
            authenticator_ids: Arc::new(AuthenticatorIdTable::new()),
            health: HealthBus::default(),
            names,
            current: Mutex::new(None),
        });
        let router = tokio::spawn(EventRouter::new(Arc::clone(&shared), hal_rx, ctl_rx).run());
        Self {
            shared,
            hal_sink: EventSink::new(hal_tx),
            ctl_tx,
            epochs: AtomicU64::new(0),
            router,
        }
    }

    /// Create a hardware session for `user_id`, replacing any existing one.
    ///
    /// Registers the sensor's event sink with the daemon and subscribes to
    /// the new session's transport death.  On failure the error propagates
    /// and no session is installed; any prior session stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`BiomError::HalCommunication`] when the remote create call
    /// fails.
    pub async fn create_session(
        &self,
        daemon: &dyn SensorDaemon,
        user_id: UserId,
    ) -> Result<(), BiomError> {
        let sensor_id = self.shared.properties.sensor_id;
        let handle = daemon
            .create_session(sensor_id, user_id, self.hal_sink.clone())
            .await?;

        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed) + 1;
        let closed = handle.closed();
        let ctl_tx = self.ctl_tx.clone();
        let death_watch = tokio::spawn(async move {
            closed.await;
            let _ = ctl_tx.send(ControlMessage::ChannelDied { epoch });
        });

        let slot = SessionSlot {
            epoch,
            user_id,
            handle,
            death_watch,
        };
        let mut current = self
            .shared
            .current
            .lock()
            .expect("session slot lock poisoned");
        if let Some(old) = current.replace(slot) {
            debug!(old_epoch = old.epoch, "replacing existing session");
        }
        info!(sensor_id, user_id, epoch, "hardware session created");
        Ok(())
    }

    /// Whether a session exists and is bound to `user_id`.
    pub fn has_session(&self, user_id: UserId) -> bool {
        matches!(
            self.shared
                .current
                .lock()
                .expect("session slot lock poisoned")
                .as_ref(),
            Some(slot) if slot.user_id == user_id
        )
    }

    /// Handle that resolves the current hardware session at call time.
    pub fn lazy_session(&self) -> LazySession {
        LazySession {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Static properties of this sensor.
    pub fn properties(&self) -> &SensorProperties {
        &self.shared.properties
    }

    /// Shared per-user lockout state.
    pub fn lockout_cache(&self) -> Arc<LockoutCache> {
        Arc::clone(&self.shared.lockout)
    }

    /// Shared per-user authenticator-id table.
    pub fn authenticator_ids(&self) -> Arc<AuthenticatorIdTable> {
        Arc::clone(&self.shared.authenticator_ids)
    }

    /// Subscribe to health-issue signals (currently: HAL death).
    pub fn subscribe_health(&self) -> broadcast::Receiver<HealthIssue> {
        self.shared.health.subscribe()
    }
}

impl Drop for Sensor {
    fn drop(&mut self) {
        self.router.abort();
    }
}

/// Resolves "the current hardware session" at call time, or `None` when no
/// session is installed.
///
/// Callers must not cache the resolved handle across a suspension point: the
/// session can be replaced or cleared between calls.
#[derive(Clone)]
pub struct LazySession {
    shared: Arc<SensorShared>,
}

impl LazySession {
    pub fn get(&self) -> Option<Arc<dyn HalSession>> {
        self.shared
            .current
            .lock()
            .expect("session slot lock poisoned")
            .as_ref()
            .map(|slot| Arc::clone(&slot.handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{
        AcquisitionConsumer, EnrollConsumer, ErrorConsumer, Operation,
    };
    use biomd_hal::{SimCommand, SimDaemon};
    use biomd_types::{
        AcquiredInfo, BiometricIdentifier, HealthCause, Modality, SensorErrorCode, SensorStrength,
    };
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn props() -> SensorProperties {
        SensorProperties {
            sensor_id: 3,
            modality: Modality::Fingerprint,
            strength: SensorStrength::Strong,
            max_enrollments_per_user: 5,
        }
    }

    #[derive(Default)]
    struct StaticScheduler {
        current: Mutex<Option<Arc<Operation>>>,
        faults: AtomicUsize,
    }

    impl StaticScheduler {
        fn set(&self, operation: Option<Operation>) {
            *self.current.lock().unwrap() = operation.map(Arc::new);
        }
        fn fault_count(&self) -> usize {
            self.faults.load(Ordering::SeqCst)
        }
    }

    impl Scheduler for StaticScheduler {
        fn current_operation(&self) -> Option<Arc<Operation>> {
            self.current.lock().unwrap().clone()
        }
        fn record_fault_marker(&self) {
            self.faults.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Enroll-shaped operation that records received errors.
    struct ErrOp {
        errors: Mutex<Vec<(SensorErrorCode, i32)>>,
    }

    impl ErrOp {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                errors: Mutex::new(Vec::new()),
            })
        }
        fn errors(&self) -> Vec<(SensorErrorCode, i32)> {
            self.errors.lock().unwrap().clone()
        }
    }

    impl AcquisitionConsumer for ErrOp {
        fn on_acquired(&self, _info: AcquiredInfo, _vendor_code: i32) {}
    }
    impl ErrorConsumer for ErrOp {
        fn on_error(&self, error: SensorErrorCode, vendor_code: i32) {
            self.errors.lock().unwrap().push((error, vendor_code));
        }
    }
    impl EnrollConsumer for ErrOp {
        fn target_user(&self) -> UserId {
            0
        }
        fn on_enroll_progress(&self, _identifier: BiometricIdentifier, _remaining: u32) {}
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("timed out waiting for condition");
    }

    /// Give the router task a chance to drain anything already enqueued.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn create_session_binds_user_and_exposes_handle() {
        let sensor = Sensor::new(props(), Arc::new(StaticScheduler::default()));
        let daemon = SimDaemon::new();

        assert!(!sensor.has_session(7));
        assert!(sensor.lazy_session().get().is_none());

        sensor.create_session(&daemon, 7).await.unwrap();

        assert!(sensor.has_session(7));
        assert!(!sensor.has_session(8));
        assert!(sensor.lazy_session().get().is_some());
        assert_eq!(daemon.last_session().unwrap().user_id(), 7);
    }

    #[tokio::test]
    async fn failed_create_installs_nothing() {
        let sensor = Sensor::new(props(), Arc::new(StaticScheduler::default()));
        let daemon = SimDaemon::new();
        daemon.set_create_failure(true);

        let result = sensor.create_session(&daemon, 1).await;
        assert!(matches!(result, Err(BiomError::HalCommunication(_))));
        assert!(!sensor.has_session(1));
        assert!(sensor.lazy_session().get().is_none());
    }

    #[tokio::test]
    async fn failed_create_leaves_previous_session_in_place() {
        let sensor = Sensor::new(props(), Arc::new(StaticScheduler::default()));
        let daemon = SimDaemon::new();

        sensor.create_session(&daemon, 1).await.unwrap();
        daemon.set_create_failure(true);
        assert!(sensor.create_session(&daemon, 2).await.is_err());

        assert!(sensor.has_session(1));
        assert!(!sensor.has_session(2));
    }

    #[tokio::test]
    async fn last_successful_create_wins() {
        let sensor = Sensor::new(props(), Arc::new(StaticScheduler::default()));
        let daemon = SimDaemon::new();

        sensor.create_session(&daemon, 1).await.unwrap();
        sensor.create_session(&daemon, 2).await.unwrap();
        sensor.create_session(&daemon, 3).await.unwrap();

        assert!(!sensor.has_session(1));
        assert!(!sensor.has_session(2));
        assert!(sensor.has_session(3));
        assert_eq!(daemon.session_count(), 3);
    }

    #[tokio::test]
    async fn lazy_session_resolves_current_at_call_time() {
        let sensor = Sensor::new(props(), Arc::new(StaticScheduler::default()));
        let daemon = SimDaemon::new();
        let lazy = sensor.lazy_session();

        sensor.create_session(&daemon, 1).await.unwrap();
        sensor.create_session(&daemon, 2).await.unwrap();

        // The handle obtained before both creates resolves to the newest
        // session.
        lazy.get()
            .expect("session must be present")
            .authenticate(42)
            .await
            .unwrap();

        let newest = daemon.last_session().unwrap();
        assert_eq!(
            newest.commands(),
            vec![SimCommand::Authenticate { operation_id: 42 }]
        );
    }

    #[tokio::test]
    async fn channel_death_notifies_faults_and_clears_session() {
        let scheduler = Arc::new(StaticScheduler::default());
        let op = ErrOp::new();
        scheduler.set(Some(Operation::Enroll(op.clone())));

        let sensor = Sensor::new(props(), scheduler.clone());
        let mut health = sensor.subscribe_health();
        let daemon = SimDaemon::new();
        sensor.create_session(&daemon, 1).await.unwrap();

        daemon.last_session().unwrap().trigger_hal_death();

        wait_until(|| !sensor.has_session(1)).await;
        assert_eq!(
            op.errors(),
            vec![(SensorErrorCode::HardwareUnavailable, 0)]
        );
        assert_eq!(scheduler.fault_count(), 1);

        let issue = health.recv().await.expect("health issue must be published");
        assert_eq!(issue.cause, HealthCause::HalDeath);
        assert_eq!(issue.modality, Modality::Fingerprint);
    }

    #[tokio::test]
    async fn channel_death_still_recorded_without_error_consumer() {
        struct IdOnlyOp;
        impl crate::operation::GetAuthenticatorIdConsumer for IdOnlyOp {
            fn on_authenticator_id_retrieved(&self, _authenticator_id: u64) {}
        }

        let scheduler = Arc::new(StaticScheduler::default());
        scheduler.set(Some(Operation::GetAuthenticatorId(Arc::new(IdOnlyOp))));

        let sensor = Sensor::new(props(), scheduler.clone());
        let mut health = sensor.subscribe_health();
        let daemon = SimDaemon::new();
        sensor.create_session(&daemon, 1).await.unwrap();

        daemon.last_session().unwrap().trigger_hal_death();

        // The synthetic error has nowhere to go, but the fault marker, the
        // health signal, and the session clear still happen.
        wait_until(|| !sensor.has_session(1)).await;
        assert_eq!(scheduler.fault_count(), 1);
        let issue = health.recv().await.expect("health issue must be published");
        assert_eq!(issue.cause, HealthCause::HalDeath);
    }

    #[tokio::test]
    async fn channel_death_without_session_is_noop() {
        let scheduler = Arc::new(StaticScheduler::default());
        let sensor = Sensor::new(props(), scheduler.clone());

        // No session was ever created for this epoch.
        sensor
            .ctl_tx
            .send(ControlMessage::ChannelDied { epoch: 1 })
            .unwrap();

        settle().await;
        assert_eq!(scheduler.fault_count(), 0);
    }

    #[tokio::test]
    async fn stale_death_notification_does_not_clear_new_session() {
        let scheduler = Arc::new(StaticScheduler::default());
        let sensor = Sensor::new(props(), scheduler.clone());
        let daemon = SimDaemon::new();

        sensor.create_session(&daemon, 1).await.unwrap(); // epoch 1
        sensor.create_session(&daemon, 2).await.unwrap(); // epoch 2

        sensor
            .ctl_tx
            .send(ControlMessage::ChannelDied { epoch: 1 })
            .unwrap();

        settle().await;
        assert!(sensor.has_session(2));
        assert_eq!(scheduler.fault_count(), 0);
    }

    #[tokio::test]
    async fn replaced_session_death_watch_never_fires() {
        let scheduler = Arc::new(StaticScheduler::default());
        let sensor = Sensor::new(props(), scheduler.clone());
        let daemon = SimDaemon::new();

        sensor.create_session(&daemon, 1).await.unwrap();
        let old = daemon.last_session().unwrap();
        sensor.create_session(&daemon, 2).await.unwrap();

        // The old transport dying must not disturb the new session: its
        // watch was aborted on replacement, and the epoch check backstops
        // any already-queued notification.
        old.trigger_hal_death();

        settle().await;
        assert!(sensor.has_session(2));
        assert_eq!(scheduler.fault_count(), 0);
    }

    #[tokio::test]
    async fn repeated_death_notification_is_idempotent() {
        let scheduler = Arc::new(StaticScheduler::default());
        let op = ErrOp::new();
        scheduler.set(Some(Operation::Enroll(op.clone())));

        let sensor = Sensor::new(props(), scheduler.clone());
        let daemon = SimDaemon::new();
        sensor.create_session(&daemon, 1).await.unwrap(); // epoch 1

        daemon.last_session().unwrap().trigger_hal_death();
        wait_until(|| !sensor.has_session(1)).await;

        // A duplicate notification for the same epoch finds no matching
        // session and must do nothing further.
        sensor
            .ctl_tx
            .send(ControlMessage::ChannelDied { epoch: 1 })
            .unwrap();

        settle().await;
        assert_eq!(scheduler.fault_count(), 1);
        assert_eq!(op.errors().len(), 1);
    }

    #[tokio::test]
    async fn lockout_and_authenticator_tables_are_shared_handles() {
        let sensor = Sensor::new(props(), Arc::new(StaticScheduler::default()));

        sensor
            .lockout_cache()
            .set(1, biomd_types::LockoutMode::Permanent);
        sensor.authenticator_ids().record(1, 55);

        assert_eq!(
            sensor.lockout_cache().get(1),
            biomd_types::LockoutMode::Permanent
        );
        assert_eq!(sensor.authenticator_ids().get(1), Some(55));
    }
}
