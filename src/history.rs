use std::collections::VecDeque;
use std::fmt;

/// Fixed-capacity FIFO: pushing onto a full buffer evicts the oldest item.
/// Iteration goes from oldest to newest.
pub struct History<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for History<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for History<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("capacity", &self.capacity)
            .field("items", &self.deque)
            .finish()
    }
}

impl<T> History<T> {
    /// A zero capacity would drop every item, so it is bumped to one.
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        let capacity = cap.max(1);

        Self {
            deque: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`, returning the evicted oldest item if the buffer was full.
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.deque.pop_front()
        } else {
            None
        };

        self.deque.push_back(item);

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deque.clear()
    }

    #[inline]
    pub fn newest(&self) -> Option<&T> {
        self.deque.back()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest() {
        let mut h = History::with_capacity(3);

        assert_eq!(h.push(1), None);
        assert_eq!(h.push(2), None);
        assert_eq!(h.push(3), None);
        assert!(h.is_full());
        assert_eq!(h.push(4), Some(1));

        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(h.newest(), Some(&4));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn zero_capacity_keeps_latest() {
        let mut h = History::with_capacity(0);
        h.push('a');
        h.push('b');

        assert_eq!(h.capacity(), 1);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![&'b']);
    }
}
