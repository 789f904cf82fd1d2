//! TTL-bounded snapshot cell shared by the two engine caches.
//!
//! A cell holds one immutable `Arc` snapshot plus the instant it was
//! fetched. Readers clone the `Arc`; a refresh swaps the whole snapshot
//! in one write, so concurrent readers never observe a torn update.
//! Expired snapshots stay in the cell until overwritten — they are the
//! fallback value when a refresh fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, MutexGuard, RwLock};

#[derive(Debug)]
struct Snapshot<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

/// One cached payload with a fixed TTL and a refresh-coalescing gate.
#[derive(Debug)]
pub struct TtlCell<T> {
    ttl: Duration,
    slot: RwLock<Option<Snapshot<T>>>,
    refresh: Mutex<()>,
}

impl<T> TtlCell<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// The current snapshot, only if it is within its TTL.
    pub async fn fresh(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|snapshot| snapshot.fetched_at.elapsed() <= self.ttl)
            .map(|snapshot| Arc::clone(&snapshot.value))
    }

    /// The current snapshot regardless of age. Serve-stale fallback for
    /// when a refresh fails.
    pub async fn any(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().await;
        slot.as_ref().map(|snapshot| Arc::clone(&snapshot.value))
    }

    /// Swap in a new snapshot stamped "now". Payload and timestamp
    /// change in one write, never separately.
    pub async fn store(&self, value: T) {
        let mut slot = self.slot.write().await;
        *slot = Some(Snapshot {
            value: Arc::new(value),
            fetched_at: Instant::now(),
        });
    }

    /// Acquire the refresh gate. At most one refresh of this cell runs
    /// at a time; waiters must re-check [`TtlCell::fresh`] after the
    /// gate opens, since the previous holder may have refreshed already.
    pub async fn begin_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh.lock().await
    }

    /// Rewind the snapshot timestamp past the TTL.
    #[cfg(test)]
    pub(crate) async fn force_expire(&self) {
        let mut slot = self.slot.write().await;
        if let Some(snapshot) = slot.as_mut() {
            if let Some(past) = Instant::now().checked_sub(self.ttl + Duration::from_secs(1)) {
                snapshot.fetched_at = past;
            }
        }
    }
}
