//! Keyed in-memory table

use std::collections::HashMap;
use std::hash::Hash;

/// Map with insert-or-replace semantics used for per-phase bookkeeping
#[derive(Debug, Clone)]
pub struct KeyedTable<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for KeyedTable<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> KeyedTable<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`, returning the value it replaced
    pub fn insert_or_replace(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Keep only entries for which `keep` returns true
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.entries.retain(|key, value| keep(key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
