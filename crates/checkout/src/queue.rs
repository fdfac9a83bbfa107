//! Unbounded FIFO handing work from checkout to background delivery.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// A thread-safe, unbounded first-in first-out queue.
///
/// Clones share the same underlying queue. `push` never blocks on capacity
/// and the lock is held only for the single operation.
pub struct WorkQueue<T> {
    inner: Arc<Mutex<VecDeque<T>>>,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn push(&self, item: T) {
        self.inner.lock().push_back(item);
    }

    /// Removes and returns the oldest item.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Takes every queued item, oldest first, in one critical section.
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().drain(..).collect()
    }
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue").field("len", &self.len()).finish()
    }
}
