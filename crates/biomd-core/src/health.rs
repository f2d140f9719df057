//! [`HealthBus`] – broadcast channel for health-issue signals.
//!
//! Uses [`tokio::sync::broadcast`] so every diagnostics subscriber receives
//! every issue without any single subscriber blocking the others.  The only
//! producer in this core is the hardware channel-death path; publishing with
//! no subscriber is a normal condition, not an error.

use biomd_types::HealthIssue;
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered issues before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 32;

/// Shared health-signal bus.  Clone it cheaply – all clones share the same
/// underlying broadcast channel.
#[derive(Clone, Debug)]
pub struct HealthBus {
    tx: broadcast::Sender<HealthIssue>,
}

impl HealthBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish `issue` to every active subscriber.
    ///
    /// Returns the number of subscribers that were handed the issue; `0`
    /// when nobody is listening, which is normal.
    pub fn publish(&self, issue: HealthIssue) -> usize {
        self.tx.send(issue).unwrap_or(0)
    }

    /// Subscribe to all future health issues.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthIssue> {
        self.tx.subscribe()
    }
}

impl Default for HealthBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biomd_types::{HealthCause, Modality};
    use chrono::Utc;

    fn issue() -> HealthIssue {
        HealthIssue {
            modality: Modality::Fingerprint,
            cause: HealthCause::HalDeath,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = HealthBus::default();
        let mut rx = bus.subscribe();

        assert_eq!(bus.publish(issue()), 1);

        let received = rx.recv().await.expect("subscriber must receive");
        assert_eq!(received.cause, HealthCause::HalDeath);
        assert_eq!(received.modality, Modality::Fingerprint);
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = HealthBus::default();
        assert_eq!(bus.publish(issue()), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_issue() {
        let bus = HealthBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(issue());

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
