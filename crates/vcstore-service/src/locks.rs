use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use vcstore_core::InstanceRef;

/// Per-instance mutual exclusion for provisioning.
///
/// Calls for different instances never contend. Entries nobody holds or
/// waits on are pruned on the next acquisition.
#[derive(Debug, Default)]
pub struct InstanceLocks {
    locks: Mutex<HashMap<InstanceRef, Arc<AsyncMutex<()>>>>,
}

impl InstanceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `instance`; released when the guard drops.
    pub async fn acquire(&self, instance: &InstanceRef) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|key, lock| key == instance || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(instance.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of instances with a tracked lock.
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}
