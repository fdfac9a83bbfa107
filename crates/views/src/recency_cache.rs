//! Fixed-capacity least-recently-used cache.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::error::CacheError;

const NIL: usize = usize::MAX;

struct Slot<K, V> {
    entry: Option<(K, V)>,
    prev: usize,
    next: usize,
}

/// Slab-backed doubly-linked list plus key index.
///
/// `head` is the most recently used slot, `tail` the least. Vacant slots are
/// kept on `free` and reused before the slab grows.
struct Lru<K, V> {
    map: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    /// Bumped by every invalidation, whether or not the key was present.
    generation: u64,
}

impl<K: Eq + Hash + Clone, V> Lru<K, V> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            generation: 0,
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);

        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }

        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn promote(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    /// Unlinks a slot, frees it, and returns its entry.
    fn release(&mut self, idx: usize) -> Option<(K, V)> {
        self.unlink(idx);
        self.free.push(idx);
        self.slots[idx].entry.take()
    }

    fn allocate(&mut self, key: K, value: V) -> usize {
        let slot = Slot {
            entry: Some((key, value)),
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn value_mut(&mut self, idx: usize) -> Option<&mut V> {
        self.slots[idx].entry.as_mut().map(|(_, v)| v)
    }

    /// Keys from most to least recently used.
    fn keys_by_recency(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.map.len());
        let mut idx = self.head;
        while idx != NIL {
            if let Some((k, _)) = &self.slots[idx].entry {
                keys.push(k.clone());
            }
            idx = self.slots[idx].next;
        }
        keys
    }
}

/// A thread-safe map that holds at most `capacity` entries and evicts the
/// least recently used one to make room.
///
/// `get` and `put` both count as a use. Every operation is O(1) and runs
/// under one mutex. There is no time-based expiry; callers invalidate
/// entries they know to be stale.
///
/// A reader that fills the cache from slower storage should take
/// [`generation`](Self::generation) before the read and store the result with
/// [`put_if_generation`](Self::put_if_generation). An invalidation that lands
/// in between moves the generation, and the stale fill is dropped.
pub struct BoundedRecencyCache<K, V> {
    capacity: usize,
    inner: Mutex<Lru<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedRecencyCache<K, V> {
    /// Creates a cache; a capacity of zero is rejected.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            inner: Mutex::new(Lru::new()),
        })
    }

    /// Returns a clone of the cached value and marks it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut lru = self.inner.lock();
        let idx = *lru.map.get(key)?;
        lru.promote(idx);
        lru.value_mut(idx).map(|v| v.clone())
    }

    /// Inserts or replaces a value and marks it most recently used.
    ///
    /// When the key is new and the cache is full, the least recently used
    /// entry is evicted first.
    pub fn put(&self, key: K, value: V) {
        let mut lru = self.inner.lock();
        Self::insert(&mut lru, self.capacity, key, value);
    }

    fn insert(lru: &mut Lru<K, V>, capacity: usize, key: K, value: V) {
        if let Some(&idx) = lru.map.get(&key) {
            if let Some(slot) = lru.value_mut(idx) {
                *slot = value;
            }
            lru.promote(idx);
            return;
        }

        if lru.map.len() >= capacity {
            let tail = lru.tail;
            if tail != NIL
                && let Some((evicted, _)) = lru.release(tail)
            {
                lru.map.remove(&evicted);
            }
        }

        let idx = lru.allocate(key.clone(), value);
        lru.push_front(idx);
        lru.map.insert(key, idx);
    }

    /// The current invalidation generation.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Like [`put`](Self::put), but only if no invalidation or clear has
    /// happened since `generation` was read. Returns whether the value was stored.
    pub fn put_if_generation(&self, key: K, generation: u64, value: V) -> bool {
        let mut lru = self.inner.lock();
        if lru.generation != generation {
            return false;
        }
        Self::insert(&mut lru, self.capacity, key, value);
        true
    }

    /// Removes an entry, returning its value.
    pub fn invalidate(&self, key: &K) -> Option<V> {
        let mut lru = self.inner.lock();
        lru.generation = lru.generation.wrapping_add(1);
        let idx = lru.map.remove(key)?;
        lru.release(idx).map(|(_, v)| v)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut lru = self.inner.lock();
        let generation = lru.generation.wrapping_add(1);
        *lru = Lru::new();
        lru.generation = generation;
    }

    /// Returns true if the key is cached, without changing its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().keys_by_recency()
    }
}

impl<K, V> std::fmt::Debug for BoundedRecencyCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedRecencyCache")
            .field("capacity", &self.capacity)
            .field("len", &self.inner.lock().map.len())
            .finish()
    }
}
