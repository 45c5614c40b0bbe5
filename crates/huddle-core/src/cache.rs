//! Process-wide keyed cache with single-flight initialisation.
//!
//! Concurrent callers asking for the same missing key share one
//! initialiser run. A failed initialiser leaves the slot empty so the
//! next caller retries. Entries are never evicted; only a process
//! restart clears them.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

pub struct KeyedCache<K, V> {
    slots: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Value for `key` if it has been initialised.
    pub fn get(&self, key: &K) -> Option<V> {
        self.slots.get(key).and_then(|slot| slot.get().cloned())
    }

    pub async fn get_or_try_init<F, Fut, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        // The map guard must not be held across the await below.
        let slot = self
            .slots
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        slot.get_or_try_init(init).await.cloned()
    }

    /// Overwrite the entry for `key`.
    pub fn insert(&self, key: K, value: V) {
        self.slots
            .insert(key, Arc::new(OnceCell::new_with(Some(value))));
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
