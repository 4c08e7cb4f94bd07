use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Delayed background tasks tied to the owner's lifetime.
///
/// Every task waits out its delay and then runs, unless [`cancel_all`]
/// fires first. Dropping the owner aborts whatever is still pending.
///
/// [`cancel_all`]: DeferredTasks::cancel_all
pub struct DeferredTasks {
    tasks: Mutex<JoinSet<()>>,
    cancel: watch::Sender<bool>,
    pending: Arc<AtomicUsize>,
}

impl Default for DeferredTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeferredTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredTasks")
            .field("pending", &self.pending())
            .field("cancelled", &*self.cancel.borrow())
            .finish()
    }
}

impl DeferredTasks {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            tasks: Mutex::new(JoinSet::new()),
            cancel,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Runs `task` after `delay`. Must be called within a tokio runtime.
    pub fn schedule<F>(&self, label: impl Into<String>, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        let mut cancelled = self.cancel.subscribe();
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::SeqCst);

        let mut tasks = self.tasks.lock();
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                tracing::warn!("Deferred task failed: {}", e);
            }
        }
        tasks.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    tracing::debug!(task = %label, "Running deferred task");
                    task.await;
                }
                _ = async { let _ = cancelled.wait_for(|cancelled| *cancelled).await; } => {
                    tracing::debug!(task = %label, "Deferred task cancelled");
                }
            }
            pending.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Tasks that have neither run nor been cancelled yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Cancels every pending task and any scheduled afterwards.
    pub fn cancel_all(&self) {
        self.cancel.send_replace(true);
    }

    /// Waits until every task scheduled so far has finished or been cancelled.
    pub async fn drain(&self) {
        let mut tasks = std::mem::replace(&mut *self.tasks.lock(), JoinSet::new());
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!("Deferred task failed: {}", e);
            }
        }
    }
}
