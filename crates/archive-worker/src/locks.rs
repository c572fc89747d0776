use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>;

/// One async lock per id, created on demand and dropped once nobody holds or
/// waits for it.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    inner: LockMap,
}

pub struct KeyedGuard {
    key: Uuid,
    locks: LockMap,
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: Uuid) -> KeyedGuard {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(key).or_default().clone()
        };

        let guard = mutex.lock_owned().await;
        KeyedGuard {
            key,
            locks: self.inner.clone(),
            _guard: guard,
        }
    }

    /// Number of ids with a live lock.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // The map and this guard hold the only references: no waiters.
        if map
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) <= 2)
        {
            map.remove(&self.key);
        }
    }
}
