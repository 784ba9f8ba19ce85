//! Write-once-per-key caches shared by every worker pool.
//!
//! Each key owns a slot (`Arc<OnceLock<V>>`) inside a sharded `DashMap`.
//! Shard locks are only held to find or create a slot; loading happens
//! outside of them, so a slow load never blocks readers of other keys.
//! A reader either sees no value or the complete one.

use dashmap::DashMap;

use std::hash::Hash;
use std::sync::{Arc, OnceLock};

pub struct SharedCache<K, V> {
    slots: DashMap<K, Arc<OnceLock<V>>>,
}

impl<K, V> Default for SharedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SharedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    fn slot(&self, key: &K) -> Arc<OnceLock<V>> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(key.clone()).or_default().value())
    }

    /// Value for `key`, if it has been fully populated.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.slots.get(key).and_then(|slot| slot.value().get().cloned())
    }

    /// At most one load per key: concurrent callers for the same key
    /// wait for the first loader and share its value.
    pub fn get_or_load<F>(&self, key: &K, load: F) -> V
    where
        F: FnOnce() -> V,
    {
        self.slot(key).get_or_init(load).clone()
    }

    /// Race-tolerant population: `compute` runs without any lock held,
    /// duplicate computations may happen and the first value stored wins.
    pub fn try_get_or_insert_with<F, E>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.peek(key) {
            return Ok(value);
        }

        let value = compute()?;
        Ok(self.slot(key).get_or_init(move || value).clone())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
