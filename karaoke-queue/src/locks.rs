//! Per-event mutual exclusion
//!
//! Every mutation of an event's queue or attendance runs while holding that
//! event's lock, so read-modify-write sequences (select next, compact
//! positions, reorder commit) never interleave within one process. Different
//! events proceed in parallel.

use karaoke_common::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Guard returned by [`EventLocks::acquire`]; the lock is released on drop
pub type EventGuard = OwnedMutexGuard<()>;

/// Lazily populated table of per-event async mutexes
#[derive(Clone)]
pub struct EventLocks {
    table: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
    timeout: Duration,
}

impl EventLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    fn lock_for(&self, event_id: Uuid) -> Arc<AsyncMutex<()>> {
        // The table only ever holds Arc clones, so a poisoned guard is still consistent
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        table.entry(event_id).or_default().clone()
    }

    /// Wait for exclusive access to one event
    ///
    /// Returns [`Error::Busy`] if the lock is not obtained within the
    /// configured timeout.
    pub async fn acquire(&self, event_id: Uuid) -> Result<EventGuard> {
        let lock = self.lock_for(event_id);
        tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(
                    event_id = %event_id,
                    timeout_ms = self.timeout.as_millis(),
                    "Timed out waiting for event lock"
                );
                Error::Busy(format!(
                    "Event {} is busy, try again shortly",
                    event_id
                ))
            })
    }

    /// Drop the lock slot of an archived event
    pub fn forget(&self, event_id: Uuid) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        table.remove(&event_id);
    }

    /// Number of events with a lock slot
    pub fn tracked_events(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
