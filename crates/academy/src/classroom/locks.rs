use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// Table of per-key mutexes serializing critical sections for one key at a time.
///
/// Entries are created on first use and dropped again once no caller holds or waits on them,
/// so keys that never resolve to a record leave nothing behind.
#[derive(Debug)]
pub struct LockTable<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> LockTable<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Run `critical` while holding the lock for `key`.
    ///
    /// The guarded data is `()`, so a poisoned lock carries no broken state and is recovered.
    pub fn with<T>(&self, key: &K, critical: impl FnOnce() -> T) -> T {
        let slot = self.slot(key);
        let outcome = {
            let _held = slot.lock().unwrap_or_else(PoisonError::into_inner);
            critical()
        };
        self.release(key, &slot);
        outcome
    }

    /// Drop the slot when the table and `slot` are its only owners. Clones are only handed out
    /// under the table mutex, so a waiter always shows up in the count here.
    fn release(&self, key: &K, slot: &Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(slot) == 2 {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
