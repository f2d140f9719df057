//! [`AuthenticatorIdTable`] – last known authenticator id per user.
//!
//! An authenticator id is an opaque 64-bit value the hardware issues per
//! (sensor, user) enrollment set; external consumers compare successive
//! values to decide when auth-bound keys must be invalidated.  Entries are
//! recorded only after a successful retrieve-authenticator-id round trip and
//! persist for the owning sensor's process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;

use biomd_types::UserId;

/// Keyed store of `user id →` opaque authenticator id.
#[derive(Debug, Default)]
pub struct AuthenticatorIdTable {
    ids: Mutex<HashMap<UserId, u64>>,
}

impl AuthenticatorIdTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the authenticator id retrieved for `user_id`, replacing any
    /// previous value.
    pub fn record(&self, user_id: UserId, authenticator_id: u64) {
        self.ids
            .lock()
            .expect("authenticator id table lock poisoned")
            .insert(user_id, authenticator_id);
    }

    /// The last recorded authenticator id for `user_id`, if any.
    pub fn get(&self, user_id: UserId) -> Option<u64> {
        self.ids
            .lock()
            .expect("authenticator id table lock poisoned")
            .get(&user_id)
            .copied()
    }

    /// Copy of the full table, for external key-invalidation decisions.
    pub fn snapshot(&self) -> HashMap<UserId, u64> {
        self.ids
            .lock()
            .expect("authenticator id table lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_has_no_id() {
        let table = AuthenticatorIdTable::new();
        assert_eq!(table.get(1), None);
    }

    #[test]
    fn record_and_get() {
        let table = AuthenticatorIdTable::new();
        table.record(1, 0xDEAD_BEEF);
        assert_eq!(table.get(1), Some(0xDEAD_BEEF));
    }

    #[test]
    fn record_replaces_previous_value() {
        let table = AuthenticatorIdTable::new();
        table.record(1, 10);
        table.record(1, 20);
        assert_eq!(table.get(1), Some(20));
    }

    #[test]
    fn snapshot_reflects_all_users() {
        let table = AuthenticatorIdTable::new();
        table.record(1, 10);
        table.record(2, 20);
        let snapshot = table.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&1], 10);
        assert_eq!(snapshot[&2], 20);
    }
}
