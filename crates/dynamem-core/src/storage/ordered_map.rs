use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeBounds;

use parking_lot::RwLock;

/// A sorted map guarded by a single reader/writer lock.
///
/// Every mutating call takes the write lock; every read, including
/// iteration, holds the read lock for the duration of the call and never
/// hands out guards. `parking_lot`'s lock is eventually fair, so a steady
/// stream of readers cannot starve a writer.
///
/// Ordering is the key's `Ord`. Callers that need a different order wrap
/// the key in a newtype.
pub struct ConcurrentOrderedMap<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord, V> ConcurrentOrderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.read().contains_key(key)
    }

    /// Insert or replace, returning the previous value.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.write().remove(key)
    }

    /// Remove the entry only if `pred` holds for its current value. The
    /// check and the removal happen under one write lock.
    pub fn remove_if<Q, F>(&self, key: &Q, pred: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce(&V) -> bool,
    {
        let mut map = self.inner.write();
        if map.get(key).is_some_and(pred) {
            map.remove(key)
        } else {
            None
        }
    }

    /// Mutate an existing value in place. Returns `None` if the key is absent.
    pub fn update<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce(&mut V) -> R,
    {
        self.inner.write().get_mut(key).map(f)
    }

    /// Mutate the value under `key`, creating it with `create` first if absent.
    pub fn upsert<C, F, R>(&self, key: K, create: C, f: F) -> R
    where
        C: FnOnce() -> V,
        F: FnOnce(&mut V) -> R,
    {
        f(self.inner.write().entry(key).or_insert_with(create))
    }

    /// Visit every entry in key order under one read lock.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for (k, v) in self.inner.read().iter() {
            f(k, v);
        }
    }

    /// Visit the entries inside `range` in key order under one read lock.
    pub fn for_each_in<Q, R, F>(&self, range: R, mut f: F)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        R: RangeBounds<Q>,
        F: FnMut(&K, &V),
    {
        for (k, v) in self.inner.read().range::<Q, R>(range) {
            f(k, v);
        }
    }
}

impl<K: Ord, V: Clone> ConcurrentOrderedMap<K, V> {
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.inner.read().get(key).cloned()
    }

    /// Atomic get-else-insert. `factory` runs at most once, and only when
    /// the key is absent under the write lock.
    pub fn get_or_create<F>(&self, key: K, factory: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(v) = self.inner.read().get(&key) {
            return v.clone();
        }
        self.inner.write().entry(key).or_insert_with(factory).clone()
    }

    /// Values in key order.
    pub fn values(&self) -> Vec<V> {
        self.inner.read().values().cloned().collect()
    }
}

impl<K: Ord + Clone, V: Clone> ConcurrentOrderedMap<K, V> {
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys().cloned().collect()
    }
}

impl<K: Ord, V> Default for ConcurrentOrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> fmt::Debug for ConcurrentOrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentOrderedMap")
            .field("len", &self.len())
            .finish()
    }
}
