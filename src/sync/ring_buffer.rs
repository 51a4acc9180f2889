//! Fixed-capacity ring buffer
//!
//! Storage for [`Channel`](crate::sync::channel::Channel). Not synchronized on
//! its own: the channel only touches it inside critical sections.

use core::mem::MaybeUninit;

/// Double-ended FIFO of up to `N` elements
pub struct RingBuffer<T: Copy, const N: usize> {
    buf: [MaybeUninit<T>; N],
    /// Index of the oldest element
    head: usize,
    len: usize,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    pub const fn new() -> Self {
        RingBuffer {
            buf: [const { MaybeUninit::uninit() }; N],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free slots
    #[inline]
    pub fn free(&self) -> usize {
        N - self.len
    }

    #[inline]
    fn wrap(&self, idx: usize) -> usize {
        if idx >= N { idx - N } else { idx }
    }

    /// Append at the tail; false if full
    pub fn push_back(&mut self, item: T) -> bool {
        if self.len == N {
            return false;
        }

        let tail = self.wrap(self.head + self.len);
        self.buf[tail] = MaybeUninit::new(item);
        self.len += 1;
        true
    }

    /// Insert at the head; false if full
    pub fn push_front(&mut self, item: T) -> bool {
        if self.len == N {
            return false;
        }

        self.head = if self.head == 0 { N - 1 } else { self.head - 1 };
        self.buf[self.head] = MaybeUninit::new(item);
        self.len += 1;
        true
    }

    /// Remove the oldest element
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        // SAFETY: slots in head..head+len are initialized.
        let item = unsafe { self.buf[self.head].assume_init() };
        self.head = self.wrap(self.head + 1);
        self.len -= 1;
        Some(item)
    }

    /// Remove the newest element
    pub fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        let tail = self.wrap(self.head + self.len);
        // SAFETY: the slot was inside head..head+len before the decrement.
        Some(unsafe { self.buf[tail].assume_init() })
    }

    /// Append as many elements of `items` as fit; returns the count written
    pub fn write(&mut self, items: &[T]) -> usize {
        let n = items.len().min(self.free());
        for &item in &items[..n] {
            self.push_back(item);
        }
        n
    }

    /// Remove up to `out.len()` oldest elements into `out`; returns the count read
    pub fn read(&mut self, out: &mut [T]) -> usize {
        let n = out.len().min(self.len);
        for slot in &mut out[..n] {
            if let Some(item) = self.pop_front() {
                *slot = item;
            }
        }
        n
    }

    /// Drop every element
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<T: Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
