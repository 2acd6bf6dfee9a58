//! Ready gate: defer an action until a builder yields a non-empty result.
//!
//! Menus cannot be materialized before the layer's capability metadata has
//! arrived. The gate runs the builder once up front and then re-runs it on
//! every capability-cache change notification, delivering the first
//! non-empty result to `on_ready` exactly once. The gate itself never
//! performs I/O; it only observes what the builder can see.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to a spawned gate. Cancelling guarantees that neither the builder
/// nor `on_ready` runs afterwards; cancelling twice is safe.
pub struct GateHandle {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl GateHandle {
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the gate delivered (or was cancelled) and its task ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawns gate tasks. Must be called within a tokio runtime.
pub struct ReadyGate;

impl ReadyGate {
    /// Run `builder` now and after every change notification until it yields
    /// a non-empty list, then hand the list to `on_ready` once and stop.
    ///
    /// A gate whose data never arrives parks on the watch channel; it holds
    /// no timer and is reclaimed by `GateHandle::cancel` on teardown.
    pub fn spawn<T, B, F>(
        mut changes: watch::Receiver<u64>,
        mut builder: B,
        on_ready: F,
    ) -> GateHandle
    where
        T: Send + 'static,
        B: FnMut() -> Vec<T> + Send + 'static,
        F: FnOnce(Vec<T>) + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let task = tokio::spawn(async move {
            let mut on_ready = Some(on_ready);
            loop {
                if flag.load(Ordering::SeqCst) {
                    return;
                }
                let items = builder();
                if !items.is_empty() {
                    if flag.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Some(deliver) = on_ready.take() {
                        deliver(items);
                    }
                    return;
                }
                if changes.changed().await.is_err() {
                    // change source gone; nothing will ever materialize
                    debug!("gate change source closed before readiness");
                    return;
                }
            }
        });
        GateHandle { cancelled, task }
    }
}
