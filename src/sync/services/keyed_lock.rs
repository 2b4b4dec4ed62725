//! Per-key async mutual exclusion with self-pruning entries.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap<K> = Mutex<HashMap<K, Arc<AsyncMutex<()>>>>;

/// One async mutex per key, created on first use.
///
/// An entry lives only while a guard or a waiter holds it, so the map stays
/// as small as the number of keys currently in use.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    locks: Arc<LockMap<K>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Creates an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the turn of `key`.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let mutex = self.mutex_for(&key);
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            key,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Takes the turn of `key` if nobody holds it.
    pub fn try_lock(&self, key: K) -> Option<KeyedGuard<K>> {
        let mutex = self.mutex_for(&key);
        match Arc::clone(&mutex).try_lock_owned() {
            Ok(guard) => Some(KeyedGuard {
                key,
                guard: Some(guard),
                locks: Arc::clone(&self.locks),
            }),
            Err(_busy) => {
                release(&self.locks, &key, mutex);
                None
            }
        }
    }

    /// Returns the number of keys currently locked or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether no key is locked or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mutex_for(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

/// Holds the turn of one key; dropping it releases the turn.
#[derive(Debug)]
pub struct KeyedGuard<K: Eq + Hash> {
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap<K>>,
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());
        prune(&mut locks, &self.key);
    }
}

fn release<K: Eq + Hash>(locks: &LockMap<K>, key: &K, mutex: Arc<AsyncMutex<()>>) {
    let mut map = locks.lock().unwrap_or_else(PoisonError::into_inner);
    drop(mutex);
    prune(&mut map, key);
}

// Only the map itself references an idle entry; every handle is cloned
// under the map lock, so a count of one cannot race with a new waiter.
fn prune<K: Eq + Hash>(map: &mut HashMap<K, Arc<AsyncMutex<()>>>, key: &K) {
    if map
        .get(key)
        .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
    {
        map.remove(key);
    }
}
