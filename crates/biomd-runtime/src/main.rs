//! `biomd` – headless demonstration host.
//!
//! Wires a [`Sensor`] to the in-process [`SimDaemon`], creates a session for
//! the configured default user, and logs health issues until interrupted.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use biomd_core::{Operation, Scheduler, Sensor};
use biomd_hal::SimDaemon;

/// Scheduler stand-in for the demo host: no operation pipeline is attached,
/// so every routed event is a (logged) mismatch by construction.
struct IdleScheduler;

impl Scheduler for IdleScheduler {
    fn current_operation(&self) -> Option<Arc<Operation>> {
        None
    }

    fn record_fault_marker(&self) {
        warn!("fault marker recorded");
    }
}

#[tokio::main]
async fn main() {
    let _guard = biomd_runtime::init_tracing("biomd");

    let config = match biomd_runtime::config::load() {
        Ok(Some(config)) => config,
        Ok(None) => biomd_runtime::Config::default(),
        Err(e) => {
            error!(%e, "failed to load config; using defaults");
            biomd_runtime::Config::default()
        }
    };
    info!(?config, "starting biomd");

    let daemon = SimDaemon::new();
    let sensor = Sensor::new(config.sensor_properties(), Arc::new(IdleScheduler));
    let mut health = sensor.subscribe_health();

    if let Err(e) = sensor.create_session(&daemon, 0).await {
        error!(%e, "initial session creation failed");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            issue = health.recv() => match issue {
                Ok(issue) => warn!(?issue, "sensor health issue"),
                Err(RecvError::Lagged(n)) => warn!(lagged_by = n, "health subscriber lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}
