//! Watcher fan-out.
//!
//! Every geometry/alarm event is delivered to each currently registered
//! watcher. Delivery is fire-and-forget: no acknowledgment, no backpressure.
//! A subscriber that cannot keep up only gets the latest snapshot per kind
//! eventually, never a replay of every intermediate one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use boatwatch_core::prelude::*;
use boatwatch_core::WatchEvent;

/// Handle identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

/// Capability set a subscriber exposes to the watch
pub trait Watcher: Send + Sync {
    fn on_event(&self, event: &WatchEvent);
}

/// Subscription table with snapshot-iteration publish.
///
/// `publish` copies the subscriber list under the lock and delivers outside
/// it, so registering or unregistering concurrently with an in-progress
/// publish (including from inside a watcher's own callback) never corrupts
/// delivery to the remaining watchers. The watcher racing its own
/// (un)registration may or may not see the in-flight event; everyone else is
/// unaffected.
pub struct WatcherRegistry {
    table: Mutex<Vec<(WatcherId, Arc<dyn Watcher>)>>,
    next_id: AtomicU64,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a watcher and return its handle.
    ///
    /// Registering the same instance twice is idempotent: the existing
    /// registration is kept and its original handle returned.
    pub fn register(&self, watcher: Arc<dyn Watcher>) -> WatcherId {
        let mut table = self.table.lock().expect("registry lock");
        if let Some((id, _)) = table.iter().find(|(_, w)| Arc::ptr_eq(w, &watcher)) {
            debug!("watcher already registered as {id:?}");
            return *id;
        }
        let id = WatcherId(self.next_id.fetch_add(1, Ordering::Relaxed));
        table.push((id, watcher));
        debug!("registered watcher {id:?} ({} total)", table.len());
        id
    }

    /// Drop a registration. Unknown handles are a no-op.
    pub fn unregister(&self, id: WatcherId) -> bool {
        let mut table = self.table.lock().expect("registry lock");
        let before = table.len();
        table.retain(|(wid, _)| *wid != id);
        let removed = table.len() < before;
        if removed {
            debug!("unregistered watcher {id:?} ({} left)", table.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.table.lock().expect("registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every watcher registered at call time, in
    /// registration order.
    pub fn publish(&self, event: &WatchEvent) {
        let snapshot: Vec<Arc<dyn Watcher>> = {
            let table = self.table.lock().expect("registry lock");
            table.iter().map(|(_, w)| Arc::clone(w)).collect()
        };
        trace!("publish {} to {} watchers", event.kind_str(), snapshot.len());
        for watcher in snapshot {
            watcher.on_event(event);
        }
    }
}

impl Default for WatcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("watchers", &self.len())
            .finish()
    }
}

/// Adapter delivering events into an unbounded channel, for UI event loops
/// on the other side of the service boundary. Dropped receivers are ignored.
pub struct ChannelWatcher {
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl ChannelWatcher {
    pub fn new(tx: mpsc::UnboundedSender<WatchEvent>) -> Self {
        Self { tx }
    }

    /// Convenience: a channel watcher plus its receiving end
    pub fn pair() -> (Arc<Self>, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self::new(tx)), rx)
    }
}

impl Watcher for ChannelWatcher {
    fn on_event(&self, event: &WatchEvent) {
        // Fire and forget; the adapter outliving its UI is not an error
        let _ = self.tx.send(event.clone());
    }
}
