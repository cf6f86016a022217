use crate::constants::INITIAL_BUFFER_CAPACITY;

/// Growable byte ring buffer with strict FIFO ordering.
///
/// Capacity grows on demand — never by less than the payload that triggered
/// the growth — and only returns to its initial size on [`clear`]. The
/// occupied region may wrap around the end of storage; all operations keep
/// head and length consistent across the wrap point.
///
/// [`clear`]: RingBuffer::clear
#[derive(Debug)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    head: usize,
    len: usize,
    initial_capacity: usize,
}

impl RingBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
            initial_capacity: capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `bytes` at the tail, growing capacity to
    /// `capacity + 2 * bytes.len()` when the spare room is insufficient.
    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.capacity() - self.len < bytes.len() {
            self.grow(self.capacity() + bytes.len() * 2);
        }

        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        let first = bytes.len().min(capacity - tail);
        self.storage[tail..tail + first].copy_from_slice(&bytes[..first]);
        if bytes.len() > first {
            self.storage[..bytes.len() - first].copy_from_slice(&bytes[first..]);
        }
        self.len += bytes.len();
    }

    /// Copy up to `out.len()` bytes from the head without consuming them.
    /// Returns the number of bytes copied.
    pub fn peek(&self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.len);
        let first = count.min(self.capacity() - self.head);
        out[..first].copy_from_slice(&self.storage[self.head..self.head + first]);
        if count > first {
            out[first..count].copy_from_slice(&self.storage[..count - first]);
        }
        count
    }

    /// Drop the first `n` bytes, capped at the occupied length.
    pub fn consume_prefix(&mut self, n: usize) {
        let n = n.min(self.len);
        self.head = (self.head + n) % self.capacity();
        self.len -= n;
        if self.len == 0 {
            self.head = 0;
        }
    }

    /// Offset of the first occurrence of `byte` relative to the head.
    pub fn find(&self, byte: u8) -> Option<usize> {
        let first = self.len.min(self.capacity() - self.head);
        if let Some(pos) = self.storage[self.head..self.head + first]
            .iter()
            .position(|&b| b == byte)
        {
            return Some(pos);
        }
        self.storage[..self.len - first]
            .iter()
            .position(|&b| b == byte)
            .map(|pos| first + pos)
    }

    /// Empty the buffer and return storage to its initial capacity.
    pub fn clear(&mut self) {
        if self.capacity() != self.initial_capacity {
            self.storage = vec![0u8; self.initial_capacity].into_boxed_slice();
        }
        self.head = 0;
        self.len = 0;
    }

    fn grow(&mut self, new_capacity: usize) {
        let mut storage = vec![0u8; new_capacity].into_boxed_slice();
        let copied = self.peek(&mut storage[..self.len]);
        debug_assert_eq!(copied, self.len);
        self.storage = storage;
        self.head = 0;
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}
