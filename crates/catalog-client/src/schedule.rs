//! Replaceable delayed tasks.
//!
//! # Design
//! - One slot per trigger kind; scheduling again replaces the waiting task.
//! - A task that has finished waiting is committed and never aborted, so the
//!   work it started (a fetch that set `loading`) always runs to completion.
//! - `settled` lets callers and tests wait until the slot is idle.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
    running: Vec<JoinHandle<()>>,
}

/// Debounce slot backed by tokio tasks.
#[derive(Default)]
pub(crate) struct Debouncer {
    slot: Mutex<Slot>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.lock();
        f.debug_struct("Debouncer")
            .field("generation", &slot.generation)
            .field("pending", &slot.pending.is_some())
            .field("running", &slot.running.len())
            .finish()
    }
}

impl Debouncer {
    /// Run `task` after `delay`, replacing any task still waiting in this slot.
    pub(crate) fn schedule<F>(self: &Arc<Self>, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime available; scheduled fetch dropped");
            return;
        };
        // Held across the spawn so the task cannot commit before its handle is stored.
        let mut slot = self.lock();
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }
        slot.running.retain(|handle| !handle.is_finished());
        let this = Arc::clone(self);
        slot.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if this.commit(generation) {
                task.await;
            }
        }));
    }

    /// Drop the waiting task, if any.
    pub(crate) fn cancel(&self) {
        let mut slot = self.lock();
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }
    }

    /// Wait until no task is waiting or running in this slot.
    pub(crate) async fn settled(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut slot = self.lock();
                let mut handles: Vec<_> = slot.running.drain(..).collect();
                handles.extend(slot.pending.take());
                handles
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                // Aborted tasks resolve to a cancellation error; nothing to report.
                let _ = handle.await;
            }
        }
    }

    fn commit(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        if slot.generation != generation {
            return false;
        }
        if let Some(handle) = slot.pending.take() {
            slot.running.push(handle);
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
