//! [`LockoutCache`] – per-user lockout state.
//!
//! Mutated only by lockout-capable operations reacting to hardware-reported
//! lockout events; read by any operation that needs to gate attempts.  No
//! eviction: entries persist for the owning sensor's process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;

use biomd_types::{LockoutMode, UserId};

/// Keyed store of `user id →` [`LockoutMode`].
///
/// All mutating callers run inside the sensor's serialized execution
/// context; the interior mutex only makes the shared handle safe to read
/// from outside it.
#[derive(Debug, Default)]
pub struct LockoutCache {
    states: Mutex<HashMap<UserId, LockoutMode>>,
}

impl LockoutCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the lockout state for `user_id`, replacing any previous state.
    pub fn set(&self, user_id: UserId, mode: LockoutMode) {
        self.states
            .lock()
            .expect("lockout cache lock poisoned")
            .insert(user_id, mode);
    }

    /// The lockout state for `user_id`; [`LockoutMode::None`] for unknown
    /// users.
    pub fn get(&self, user_id: UserId) -> LockoutMode {
        self.states
            .lock()
            .expect("lockout cache lock poisoned")
            .get(&user_id)
            .copied()
            .unwrap_or_default()
    }

    /// Reset `user_id` to [`LockoutMode::None`].  No-ops for unknown users.
    pub fn clear(&self, user_id: UserId) {
        self.states
            .lock()
            .expect("lockout cache lock poisoned")
            .remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_is_not_locked_out() {
        let cache = LockoutCache::new();
        assert_eq!(cache.get(42), LockoutMode::None);
    }

    #[test]
    fn set_and_get_timed_lockout() {
        let cache = LockoutCache::new();
        cache.set(1, LockoutMode::Timed { duration_ms: 30_000 });
        assert_eq!(cache.get(1), LockoutMode::Timed { duration_ms: 30_000 });
        // Other users are unaffected.
        assert_eq!(cache.get(2), LockoutMode::None);
    }

    #[test]
    fn permanent_lockout_replaces_timed() {
        let cache = LockoutCache::new();
        cache.set(1, LockoutMode::Timed { duration_ms: 30_000 });
        cache.set(1, LockoutMode::Permanent);
        assert_eq!(cache.get(1), LockoutMode::Permanent);
    }

    #[test]
    fn clear_resets_to_none() {
        let cache = LockoutCache::new();
        cache.set(1, LockoutMode::Permanent);
        cache.clear(1);
        assert_eq!(cache.get(1), LockoutMode::None);
    }

    #[test]
    fn clear_unknown_user_is_noop() {
        let cache = LockoutCache::new();
        // Must not panic.
        cache.clear(999);
    }
}
