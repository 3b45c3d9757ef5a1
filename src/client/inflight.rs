//! In-flight action tracking
//!
//! A lifecycle action holds an [`InFlightGuard`] for as long as its request
//! is outstanding. A second attempt at the same action on the same incident
//! is refused until the guard drops.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::{ClientError, Result};
use crate::domain::{IncidentId, LifecycleAction};

type Key = (LifecycleAction, IncidentId);

/// Set of outstanding `(action, incident)` pairs
#[derive(Debug, Default)]
pub struct InFlightTracker {
    active: Mutex<HashSet<Key>>,
}

impl InFlightTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Key>> {
        // A panic while holding the lock cannot leave the set half-updated
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim `action` on `incident_id`, or fail with [`ClientError::InFlight`]
    pub fn acquire(
        self: &Arc<Self>,
        action: LifecycleAction,
        incident_id: &IncidentId,
    ) -> Result<InFlightGuard> {
        let key = (action, incident_id.clone());
        if !self.lock().insert(key.clone()) {
            return Err(ClientError::InFlight {
                action,
                incident_id: incident_id.clone(),
            });
        }

        Ok(InFlightGuard {
            tracker: Arc::clone(self),
            key,
        })
    }

    pub fn is_in_flight(&self, action: LifecycleAction, incident_id: &IncidentId) -> bool {
        self.lock().contains(&(action, incident_id.clone()))
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}

/// Releases its claim on drop
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: Arc<InFlightTracker>,
    key: Key,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let tracker = InFlightTracker::new();
        let id: IncidentId = "INC-1".into();

        let guard = tracker
            .acquire(LifecycleAction::GenerateProof, &id)
            .unwrap();
        let err = tracker
            .acquire(LifecycleAction::GenerateProof, &id)
            .unwrap_err();
        assert!(matches!(err, ClientError::InFlight { .. }));
        assert!(tracker.is_in_flight(LifecycleAction::GenerateProof, &id));

        drop(guard);
        assert!(!tracker.is_in_flight(LifecycleAction::GenerateProof, &id));
        assert!(tracker.acquire(LifecycleAction::GenerateProof, &id).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let tracker = InFlightTracker::new();
        let a: IncidentId = "INC-1".into();
        let b: IncidentId = "INC-2".into();

        let _g1 = tracker.acquire(LifecycleAction::GenerateProof, &a).unwrap();
        let _g2 = tracker.acquire(LifecycleAction::GenerateProof, &b).unwrap();
        let _g3 = tracker.acquire(LifecycleAction::VerifyProof, &a).unwrap();
        assert_eq!(tracker.active_count(), 3);
    }
}
