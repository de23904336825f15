use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Callback invoked when the quiet period elapses.
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// Reference quiet period; catalog edits are bursty, not continuous.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

struct TriggerShared {
    /// Latest-value cell for the callback: updated unconditionally, read
    /// only at fire time, so a fire scheduled against an older callback
    /// still sees current pagination/filter state.
    callback: RwLock<Option<RefreshCallback>>,
    /// Generation of the most recent schedule. A fire only lands if its
    /// generation is still current, which closes the abort race where a
    /// timer task has already woken when `notify` supersedes it.
    generation: AtomicU64,
    fires: AtomicU64,
}

/// Collapses bursts of qualifying events into a single downstream
/// invalidation after a quiet period.
///
/// Debounce, not throttle: every `notify` cancels and replaces the pending
/// fire, so the callback runs once activity stops for the quiet period.
/// There is no maximum-wait cap — a view under continuous event pressure
/// will not refresh until events stop.
///
/// One trigger per view; the pending timer and counters are exclusively
/// owned and never shared across views.
pub struct CoalescingTrigger {
    quiet_period: Duration,
    shared: Arc<TriggerShared>,
    pending: Mutex<Option<JoinHandle<()>>>,
    notifies: AtomicU64,
}

impl CoalescingTrigger {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            shared: Arc::new(TriggerShared {
                callback: RwLock::new(None),
                generation: AtomicU64::new(0),
                fires: AtomicU64::new(0),
            }),
            pending: Mutex::new(None),
            notifies: AtomicU64::new(0),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Install or replace the refresh callback. Independent of scheduling:
    /// a pending fire picks up the replacement.
    pub fn set_callback(&self, callback: RefreshCallback) {
        *self.shared.callback.write() = Some(callback);
    }

    /// Record one qualifying event and (re)start the quiet window.
    pub fn notify(&self) {
        self.notifies.fetch_add(1, Ordering::Relaxed);

        let mut pending = self.pending.lock();
        if let Some(prev) = pending.take() {
            prev.abort();
        }

        let shared = Arc::clone(&self.shared);
        let generation = shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let quiet = self.quiet_period;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if shared.generation.load(Ordering::Acquire) != generation {
                return;
            }
            let callback = shared.callback.read().clone();
            if let Some(callback) = callback {
                shared.fires.fetch_add(1, Ordering::Relaxed);
                callback();
            }
        }));
    }

    /// Cancel any pending fire. Called on teardown; later notifies still
    /// schedule normally.
    pub fn cancel(&self) {
        // Invalidate before aborting so a task past its sleep cannot land.
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn notify_count(&self) -> u64 {
        self.notifies.load(Ordering::Relaxed)
    }

    pub fn fire_count(&self) -> u64 {
        self.shared.fires.load(Ordering::Relaxed)
    }
}

impl Drop for CoalescingTrigger {
    fn drop(&mut self) {
        self.cancel();
    }
}
