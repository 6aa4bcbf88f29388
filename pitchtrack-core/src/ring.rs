//! Fixed-capacity history buffer shared by the filter and estimator stages.
//!
//! Storage is allocated once; pushing into a full buffer overwrites the oldest
//! entry, so memory use never grows in the per-frame hot path.

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Box<[T]>,
    head: usize,
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity > 0,
            "RingBuffer capacity must be greater than zero"
        );
        Self {
            slots: vec![T::default(); capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends `value`, returning the evicted oldest entry when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let capacity = self.capacity();
        if self.is_full() {
            let evicted = std::mem::replace(&mut self.slots[self.head], value);
            self.head = (self.head + 1) % capacity;
            Some(evicted)
        } else {
            let idx = (self.head + self.len) % capacity;
            self.slots[idx] = value;
            self.len += 1;
            None
        }
    }

    /// Most recently pushed entry.
    pub fn latest(&self) -> Option<T> {
        self.get_from_latest(0)
    }

    /// Entry `offset` steps back from the newest (0 = newest).
    pub fn get_from_latest(&self, offset: usize) -> Option<T> {
        if offset >= self.len {
            return None;
        }
        let idx = (self.head + self.len - 1 - offset) % self.capacity();
        Some(self.slots[idx])
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = T> + ExactSizeIterator + '_ {
        let capacity = self.capacity();
        (0..self.len).map(move |offset| self.slots[(self.head + offset) % capacity])
    }

    /// Copies the contents, oldest first, into `out` and returns the written prefix.
    pub fn copy_into<'a>(&self, out: &'a mut [T]) -> &'a [T] {
        let n = self.len.min(out.len());
        for (dst, src) in out.iter_mut().zip(self.iter()) {
            *dst = src;
        }
        &out[..n]
    }
}
