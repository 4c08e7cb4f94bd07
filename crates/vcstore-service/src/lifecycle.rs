use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

type ShutdownHandler = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

enum HandlerSlot {
    Empty,
    Registered(ShutdownHandler),
    Consumed,
}

/// Outcome of [`LifecycleManager::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The handler ran to completion.
    Completed,
    /// The handler was abandoned at the deadline.
    TimedOut,
    /// No handler was registered, or it already ran.
    NothingRegistered,
}

/// Owns the single shutdown handler of a process.
///
/// Registration happens at most once per manager; later attempts are
/// refused. The handler runs at most once, bounded by the deadline passed
/// to [`shutdown`](LifecycleManager::shutdown).
pub struct LifecycleManager {
    slot: Mutex<HandlerSlot>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.slot.lock() {
            HandlerSlot::Empty => "empty",
            HandlerSlot::Registered(_) => "registered",
            HandlerSlot::Consumed => "consumed",
        };
        f.debug_struct("LifecycleManager")
            .field("handler", &state)
            .finish()
    }
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(HandlerSlot::Empty),
        }
    }

    /// Registers `handler` unless one was registered before.
    ///
    /// Returns `true` when this call installed the handler.
    pub fn register_once<F, Fut>(&self, handler: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if !matches!(*slot, HandlerSlot::Empty) {
            tracing::debug!("Shutdown handler already registered, ignoring");
            return false;
        }
        *slot = HandlerSlot::Registered(Box::new(move || handler().boxed()));
        true
    }

    pub fn is_registered(&self) -> bool {
        !matches!(*self.slot.lock(), HandlerSlot::Empty)
    }

    /// Runs the registered handler, giving up after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownOutcome {
        let handler = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, HandlerSlot::Consumed) {
                HandlerSlot::Registered(handler) => handler,
                previous => {
                    *slot = previous;
                    return ShutdownOutcome::NothingRegistered;
                }
            }
        };

        tracing::info!(
            "Running shutdown handler (timeout {}s)",
            timeout.as_secs()
        );

        match tokio::time::timeout(timeout, handler()).await {
            Ok(()) => {
                tracing::info!("Shutdown handler completed");
                ShutdownOutcome::Completed
            }
            Err(_) => {
                tracing::warn!(
                    "Shutdown handler did not finish within {}s, abandoning it",
                    timeout.as_secs()
                );
                ShutdownOutcome::TimedOut
            }
        }
    }
}
